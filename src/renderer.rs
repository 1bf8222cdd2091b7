//! Translation of GUI draw data into drawing backend calls.
//!
//! Every frame follows the same protocol: the render state is set up once,
//! each draw list is uploaded and its commands are issued in order with the
//! command's clip rectangle applied before its draw call, and the state is
//! torn down at the end. The backend performing the calls is abstracted by
//! [`DrawBackend`] so the protocol can be exercised without a GL context.

mod opengl;
mod version;

pub use opengl::GlRenderer;
pub use version::{GlVersion, GlslVersion};

use imgui::{sys, DrawCmd, DrawData, DrawIdx, DrawList, DrawVert, TextureId};

/// Column-major 4x4 matrix, as uploaded to the shader.
pub type Matrix4 = [[f32; 4]; 4];

/// A scissor box in framebuffer pixels, with the origin at the bottom left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct ScissorRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Placement of the GUI's display rectangle on the framebuffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameView {
    /// Top-left corner of the display rectangle, in GUI coordinates.
    pub display_pos: [f32; 2],
    /// Size of the display rectangle, in GUI coordinates.
    pub display_size: [f32; 2],
    /// GUI coordinates to framebuffer pixels.
    pub framebuffer_scale: [f32; 2],
}

impl FrameView {
    /// Size of the framebuffer the frame is drawn into, in pixels.
    pub fn framebuffer_size(&self) -> [f32; 2] {
        [
            self.display_size[0] * self.framebuffer_scale[0],
            self.display_size[1] * self.framebuffer_scale[1],
        ]
    }
}

/// An indexed triangle range to draw with one texture and one clip rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawElements {
    /// Number of indices to draw.
    pub count: usize,
    /// Clip rectangle `[min_x, min_y, max_x, max_y]` in GUI coordinates.
    pub clip_rect: [f32; 4],
    /// Texture sampled by the triangles.
    pub texture_id: TextureId,
    /// Added to every index before fetching a vertex.
    pub vtx_offset: usize,
    /// First index in the list's index buffer.
    pub idx_offset: usize,
}

/// A user callback registered on a draw list.
#[derive(Debug, Clone, Copy)]
pub struct RawCallback {
    callback: unsafe extern "C" fn(*const sys::ImDrawList, *const sys::ImDrawCmd),
    list: *const sys::ImDrawList,
    cmd: *const sys::ImDrawCmd,
}

impl RawCallback {
    /// Calls the user callback with the draw list and command it was registered on.
    ///
    /// # Safety
    ///
    /// The draw data the callback was taken from must still be alive.
    pub unsafe fn invoke(&self) {
        (self.callback)(self.list, self.cmd)
    }
}

/// One command of a draw list.
#[derive(Debug, Clone, Copy)]
#[allow(missing_docs)]
pub enum Command {
    Elements(DrawElements),
    ResetRenderState,
    Callback(RawCallback),
}

/// The vertex data and commands of one draw list.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct DrawListView<'a> {
    pub vertices: &'a [DrawVert],
    pub indices: &'a [DrawIdx],
    pub commands: Vec<Command>,
}

impl<'a> DrawListView<'a> {
    fn from_draw_list(list: &'a DrawList) -> Self {
        let raw_list = list as *const DrawList as *const sys::ImDrawList;
        let commands = list
            .commands()
            .map(|command| match command {
                DrawCmd::Elements { count, cmd_params } => Command::Elements(DrawElements {
                    count,
                    clip_rect: cmd_params.clip_rect,
                    texture_id: cmd_params.texture_id,
                    vtx_offset: cmd_params.vtx_offset,
                    idx_offset: cmd_params.idx_offset,
                }),
                DrawCmd::ResetRenderState => Command::ResetRenderState,
                DrawCmd::RawCallback { callback, raw_cmd } => Command::Callback(RawCallback {
                    callback,
                    list: raw_list,
                    cmd: raw_cmd,
                }),
            })
            .collect();

        DrawListView {
            vertices: list.vtx_buffer(),
            indices: list.idx_buffer(),
            commands,
        }
    }
}

/// Calls a renderer must provide to draw GUI frames.
pub trait DrawBackend {
    /// Enables blending and scissoring, disables culling and depth testing,
    /// and binds the projection for a framebuffer of `framebuffer_size` pixels.
    fn set_up_render_state(&mut self, projection: &Matrix4, framebuffer_size: [i32; 2]);

    /// Makes a draw list's vertices and indices the source of following draws.
    fn upload(&mut self, vertices: &[DrawVert], indices: &[DrawIdx]);

    /// Restricts following draws to `rect`.
    fn set_scissor(&mut self, rect: ScissorRect);

    /// Draws an index range of the last uploaded draw list.
    fn draw_elements(&mut self, elements: &DrawElements);

    /// Runs a user callback in place of a draw.
    fn run_callback(&mut self, callback: &RawCallback);

    /// Disables what [`DrawBackend::set_up_render_state`] enabled.
    fn tear_down(&mut self);
}

/// Orthographic projection mapping the display rectangle onto clip space,
/// with the top-left corner of the display at `(-1, 1)`.
pub fn orthographic_projection(frame: &FrameView) -> Matrix4 {
    let l = frame.display_pos[0];
    let r = frame.display_pos[0] + frame.display_size[0];
    let t = frame.display_pos[1];
    let b = frame.display_pos[1] + frame.display_size[1];

    [
        [2.0 / (r - l), 0.0, 0.0, 0.0],
        [0.0, 2.0 / (t - b), 0.0, 0.0],
        [0.0, 0.0, -1.0, 0.0],
        [(r + l) / (l - r), (t + b) / (b - t), 0.0, 1.0],
    ]
}

/// Converts a GUI clip rectangle to a framebuffer scissor box.
///
/// Returns `None` when the rectangle is empty, in which case nothing should be drawn.
pub fn scissor_rect(frame: &FrameView, clip_rect: [f32; 4]) -> Option<ScissorRect> {
    let [pos_x, pos_y] = frame.display_pos;
    let [scale_x, scale_y] = frame.framebuffer_scale;

    let min_x = (clip_rect[0] - pos_x) * scale_x;
    let min_y = (clip_rect[1] - pos_y) * scale_y;
    let max_x = (clip_rect[2] - pos_x) * scale_x;
    let max_y = (clip_rect[3] - pos_y) * scale_y;

    if max_x <= min_x || max_y <= min_y {
        return None;
    }

    // GL puts the origin at the bottom left.
    let fb_height = frame.framebuffer_size()[1];
    Some(ScissorRect {
        x: min_x as i32,
        y: (fb_height - max_y) as i32,
        width: (max_x - min_x) as i32,
        height: (max_y - min_y) as i32,
    })
}

/// Draws `lists` in order through `backend`.
pub fn render_lists<B: DrawBackend>(backend: &mut B, frame: &FrameView, lists: &[DrawListView<'_>]) {
    if lists.is_empty() {
        return;
    }

    let [fb_width, fb_height] = frame.framebuffer_size();
    if fb_width <= 0.0 || fb_height <= 0.0 {
        return;
    }
    let framebuffer_size = [fb_width as i32, fb_height as i32];

    let projection = orthographic_projection(frame);
    backend.set_up_render_state(&projection, framebuffer_size);

    for list in lists {
        backend.upload(list.vertices, list.indices);
        for command in &list.commands {
            match command {
                Command::Elements(elements) => {
                    if let Some(rect) = scissor_rect(frame, elements.clip_rect) {
                        backend.set_scissor(rect);
                        backend.draw_elements(elements);
                    }
                }
                Command::ResetRenderState => {
                    backend.set_up_render_state(&projection, framebuffer_size)
                }
                Command::Callback(callback) => backend.run_callback(callback),
            }
        }
    }

    backend.tear_down();
}

/// Draws a frame of GUI draw data through `backend`.
pub fn render_draw_data<B: DrawBackend>(backend: &mut B, draw_data: &DrawData) {
    let frame = FrameView {
        display_pos: draw_data.display_pos,
        display_size: draw_data.display_size,
        framebuffer_scale: draw_data.framebuffer_scale,
    };
    let lists: Vec<DrawListView<'_>> = draw_data
        .draw_lists()
        .map(DrawListView::from_draw_list)
        .collect();
    render_lists(backend, &frame, &lists);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        SetUp([i32; 2]),
        Upload(usize, usize),
        Scissor(ScissorRect),
        Draw(usize, usize),
        Callback,
        TearDown,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
    }

    impl DrawBackend for Recorder {
        fn set_up_render_state(&mut self, _projection: &Matrix4, framebuffer_size: [i32; 2]) {
            self.calls.push(Call::SetUp(framebuffer_size));
        }

        fn upload(&mut self, vertices: &[DrawVert], indices: &[DrawIdx]) {
            self.calls.push(Call::Upload(vertices.len(), indices.len()));
        }

        fn set_scissor(&mut self, rect: ScissorRect) {
            self.calls.push(Call::Scissor(rect));
        }

        fn draw_elements(&mut self, elements: &DrawElements) {
            self.calls.push(Call::Draw(elements.idx_offset, elements.count));
        }

        fn run_callback(&mut self, _callback: &RawCallback) {
            self.calls.push(Call::Callback);
        }

        fn tear_down(&mut self) {
            self.calls.push(Call::TearDown);
        }
    }

    fn frame(width: f32, height: f32) -> FrameView {
        FrameView {
            display_pos: [0.0, 0.0],
            display_size: [width, height],
            framebuffer_scale: [1.0, 1.0],
        }
    }

    fn elements(clip_rect: [f32; 4], idx_offset: usize, count: usize) -> Command {
        Command::Elements(DrawElements {
            count,
            clip_rect,
            texture_id: TextureId::new(1),
            vtx_offset: 0,
            idx_offset,
        })
    }

    static VERTICES: [DrawVert; 3] = [
        DrawVert { pos: [0.0, 0.0], uv: [0.0, 0.0], col: [255; 4] },
        DrawVert { pos: [10.0, 0.0], uv: [1.0, 0.0], col: [255; 4] },
        DrawVert { pos: [0.0, 10.0], uv: [0.0, 1.0], col: [255; 4] },
    ];
    static INDICES: [DrawIdx; 6] = [0, 1, 2, 2, 1, 0];

    fn assert_maps_to(m: &Matrix4, x: f32, y: f32, expected: [f32; 2]) {
        let actual = [
            m[0][0] * x + m[1][0] * y + m[3][0],
            m[0][1] * x + m[1][1] * y + m[3][1],
        ];
        assert!(
            (actual[0] - expected[0]).abs() < 1e-5 && (actual[1] - expected[1]).abs() < 1e-5,
            "({x}, {y}) mapped to {actual:?}, expected {expected:?}"
        );
    }

    #[test]
    fn commands_are_clipped_then_drawn_between_setup_and_teardown() {
        let lists = [DrawListView {
            vertices: &VERTICES,
            indices: &INDICES,
            commands: vec![
                elements([0.0, 0.0, 100.0, 50.0], 0, 3),
                elements([10.0, 5.0, 30.0, 25.0], 3, 3),
            ],
        }];
        let mut recorder = Recorder::default();
        render_lists(&mut recorder, &frame(100.0, 50.0), &lists);

        assert_eq!(
            recorder.calls,
            vec![
                Call::SetUp([100, 50]),
                Call::Upload(3, 6),
                Call::Scissor(ScissorRect { x: 0, y: 0, width: 100, height: 50 }),
                Call::Draw(0, 3),
                Call::Scissor(ScissorRect { x: 10, y: 25, width: 20, height: 20 }),
                Call::Draw(3, 3),
                Call::TearDown,
            ]
        );
    }

    #[test]
    fn every_list_is_uploaded_before_its_commands() {
        let lists = [
            DrawListView {
                vertices: &VERTICES,
                indices: &INDICES[..3],
                commands: vec![elements([0.0, 0.0, 10.0, 10.0], 0, 3)],
            },
            DrawListView {
                vertices: &VERTICES[..2],
                indices: &INDICES,
                commands: vec![elements([0.0, 0.0, 10.0, 10.0], 0, 6)],
            },
        ];
        let mut recorder = Recorder::default();
        render_lists(&mut recorder, &frame(10.0, 10.0), &lists);

        let uploads_and_draws: Vec<_> = recorder
            .calls
            .iter()
            .filter(|call| matches!(call, Call::Upload(..) | Call::Draw(..)))
            .cloned()
            .collect();
        assert_eq!(
            uploads_and_draws,
            vec![
                Call::Upload(3, 3),
                Call::Draw(0, 3),
                Call::Upload(2, 6),
                Call::Draw(0, 6),
            ]
        );
    }

    #[test]
    fn no_lists_issue_nothing() {
        let mut recorder = Recorder::default();
        render_lists(&mut recorder, &frame(100.0, 50.0), &[]);
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn minimized_framebuffer_issues_nothing() {
        let lists = [DrawListView {
            vertices: &VERTICES,
            indices: &INDICES,
            commands: vec![elements([0.0, 0.0, 10.0, 10.0], 0, 3)],
        }];
        let mut recorder = Recorder::default();
        render_lists(&mut recorder, &frame(0.0, 50.0), &lists);
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn empty_clip_rect_skips_the_draw() {
        let lists = [DrawListView {
            vertices: &VERTICES,
            indices: &INDICES,
            commands: vec![elements([20.0, 20.0, 20.0, 40.0], 0, 3)],
        }];
        let mut recorder = Recorder::default();
        render_lists(&mut recorder, &frame(100.0, 50.0), &lists);
        assert_eq!(
            recorder.calls,
            vec![Call::SetUp([100, 50]), Call::Upload(3, 6), Call::TearDown]
        );
    }

    #[test]
    fn reset_command_reapplies_setup() {
        let lists = [DrawListView {
            vertices: &VERTICES,
            indices: &INDICES,
            commands: vec![
                elements([0.0, 0.0, 10.0, 10.0], 0, 3),
                Command::ResetRenderState,
                elements([0.0, 0.0, 10.0, 10.0], 3, 3),
            ],
        }];
        let mut recorder = Recorder::default();
        render_lists(&mut recorder, &frame(10.0, 10.0), &lists);

        let setups = recorder
            .calls
            .iter()
            .filter(|call| matches!(call, Call::SetUp(_)))
            .count();
        assert_eq!(setups, 2);
        assert_eq!(recorder.calls.last(), Some(&Call::TearDown));
    }

    #[test]
    fn scissor_applies_display_offset_and_scale() {
        let frame = FrameView {
            display_pos: [5.0, 5.0],
            display_size: [100.0, 50.0],
            framebuffer_scale: [2.0, 2.0],
        };
        let rect = scissor_rect(&frame, [15.0, 10.0, 35.0, 30.0]).unwrap();
        assert_eq!(rect, ScissorRect { x: 20, y: 50, width: 40, height: 40 });
    }

    #[test]
    fn projection_maps_display_corners_to_clip_space() {
        let frame = FrameView {
            display_pos: [0.0, 0.0],
            display_size: [100.0, 50.0],
            framebuffer_scale: [1.0, 1.0],
        };
        let projection = orthographic_projection(&frame);
        assert_maps_to(&projection, 0.0, 0.0, [-1.0, 1.0]);
        assert_maps_to(&projection, 100.0, 50.0, [1.0, -1.0]);
        assert_maps_to(&projection, 50.0, 25.0, [0.0, 0.0]);
    }
}
