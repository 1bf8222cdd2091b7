use imgui::{Io, Key, MouseButton as GuiButton};
use winit::dpi::{LogicalPosition, LogicalSize, PhysicalSize};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};

/// Buttons tracked by [`InputState`], in the order of [`FrameInput::mouse_down`].
const BUTTONS: [GuiButton; 3] = [GuiButton::Left, GuiButton::Right, GuiButton::Middle];

/// Trackpad scroll distance that counts as one wheel line.
pub const PIXELS_PER_LINE: f32 = 100.0;

/// Mouse and keyboard state accumulated from window events between two frames.
#[derive(Debug, Clone)]
pub struct InputState {
    /// Cursor position in window coordinates, `None` while outside the window.
    cursor: Option<LogicalPosition<f64>>,
    /// Framebuffer pixels per window unit.
    mouse_pos_scale: [f32; 2],
    held: [bool; 3],
    /// Set on press and kept until the next frame is taken, so a click shorter
    /// than a frame is still reported.
    pressed: [bool; 3],
    wheel: [f32; 2],
    modifiers: ModifiersState,
    keys: Vec<(Key, bool)>,
    chars: Vec<char>,
}

/// What is forwarded to the GUI for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInput {
    /// Mouse position in framebuffer pixels, `None` when there is no mouse over the window.
    pub mouse_pos: Option<[f32; 2]>,
    /// Left, right and middle buttons.
    pub mouse_down: [bool; 3],
    /// Horizontal and vertical wheel movement.
    pub wheel: [f32; 2],
    /// Ctrl, Shift, Alt and Super.
    pub modifiers: [bool; 4],
    /// Key transitions in arrival order.
    pub keys: Vec<(Key, bool)>,
    /// Typed characters in arrival order.
    pub chars: Vec<char>,
}

impl Default for InputState {
    fn default() -> Self {
        InputState {
            cursor: None,
            mouse_pos_scale: [1.0, 1.0],
            held: [false; 3],
            pressed: [false; 3],
            wheel: [0.0, 0.0],
            modifiers: ModifiersState::empty(),
            keys: Vec::new(),
            chars: Vec::new(),
        }
    }
}

impl InputState {
    /// Creates an empty input state with a unit mouse position scale.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes the scale from window coordinates to framebuffer pixels.
    pub fn set_mouse_pos_scale(&mut self, framebuffer: PhysicalSize<u32>, window: LogicalSize<f64>) {
        let scale = |fb: u32, win: f64| {
            if fb == 0 || win <= 0.0 {
                1.0
            } else {
                (fb as f64 / win) as f32
            }
        };
        self.mouse_pos_scale = [
            scale(framebuffer.width, window.width),
            scale(framebuffer.height, window.height),
        ];
    }


    /// Records a window event. Returns whether the event carried input.
    pub fn handle_event(&mut self, event: &WindowEvent, scale_factor: f64) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor(Some(position.to_logical(scale_factor)))
            }
            WindowEvent::CursorLeft { .. } => self.handle_cursor(None),
            WindowEvent::MouseInput { state, button, .. } => self.handle_button(*button, *state),
            WindowEvent::MouseWheel { delta, .. } => self.handle_wheel(*delta),
            WindowEvent::ModifiersChanged(modifiers) => self.modifiers = modifiers.state(),
            WindowEvent::KeyboardInput { event, .. } => {
                let pressed = event.state == ElementState::Pressed;
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.handle_key(code, pressed);
                }
                if let Some(text) = event.text.as_ref().filter(|_| pressed) {
                    self.handle_text(text);
                }
            }
            _ => return false,
        }
        true
    }

    /// Moves the cursor, in window coordinates.
    pub fn handle_cursor(&mut self, position: Option<LogicalPosition<f64>>) {
        self.cursor = position;
    }

    /// Records a press or release of a tracked button.
    pub fn handle_button(&mut self, button: MouseButton, state: ElementState) {
        let index = match button {
            MouseButton::Left => 0,
            MouseButton::Right => 1,
            MouseButton::Middle => 2,
            _ => return,
        };
        match state {
            ElementState::Pressed => {
                self.held[index] = true;
                self.pressed[index] = true;
            }
            ElementState::Released => self.held[index] = false,
        }
    }

    /// Adds wheel movement, in lines. Pixel deltas count [`PIXELS_PER_LINE`] pixels as a line.
    pub fn handle_wheel(&mut self, delta: MouseScrollDelta) {
        let [h, v] = match delta {
            MouseScrollDelta::LineDelta(h, v) => [h, v],
            MouseScrollDelta::PixelDelta(pos) => [
                pos.x as f32 / PIXELS_PER_LINE,
                pos.y as f32 / PIXELS_PER_LINE,
            ],
        };
        self.wheel[0] += h;
        self.wheel[1] += v;
    }

    /// Queues a key transition if the GUI uses the key.
    pub fn handle_key(&mut self, code: KeyCode, pressed: bool) {
        if let Some(key) = map_key(code) {
            self.keys.push((key, pressed));
        }
    }

    /// Queues typed text, without control characters.
    pub fn handle_text(&mut self, text: &str) {
        self.chars.extend(text.chars().filter(|c| !c.is_control()));
    }

    /// Snapshot of the input to forward for the coming frame.
    pub fn frame_input(&self) -> FrameInput {
        let [scale_x, scale_y] = self.mouse_pos_scale;
        let mouse_pos = self
            .cursor
            .map(|pos| [pos.x as f32 * scale_x, pos.y as f32 * scale_y]);
        let mut mouse_down = [false; 3];
        for (i, down) in mouse_down.iter_mut().enumerate() {
            *down = self.pressed[i] || self.held[i];
        }

        FrameInput {
            mouse_pos,
            mouse_down,
            wheel: self.wheel,
            modifiers: [
                self.modifiers.control_key(),
                self.modifiers.shift_key(),
                self.modifiers.alt_key(),
                self.modifiers.super_key(),
            ],
            keys: self.keys.clone(),
            chars: self.chars.clone(),
        }
    }

    /// Snapshot of the input for the frame about to be drawn, clearing the
    /// latches, the wheel and the queued keys and characters.
    ///
    /// Input that arrives while no frame is drawn accumulates until the next
    /// call, so a release or a quick click is never dropped.
    pub fn take_frame_input(&mut self) -> FrameInput {
        let frame = self.frame_input();
        self.pressed = [false; 3];
        self.wheel = [0.0, 0.0];
        self.keys.clear();
        self.chars.clear();
        frame
    }
}

impl FrameInput {
    /// Writes this frame's input into the GUI's IO.
    pub fn apply(&self, io: &mut Io) {
        let pos = self.mouse_pos.unwrap_or([-f32::MAX, -f32::MAX]);
        io.add_mouse_pos_event(pos);
        for (button, down) in BUTTONS.into_iter().zip(self.mouse_down) {
            io.add_mouse_button_event(button, down);
        }
        if self.wheel != [0.0, 0.0] {
            io.add_mouse_wheel_event(self.wheel);
        }

        let [ctrl, shift, alt, logo] = self.modifiers;
        io.add_key_event(Key::ModCtrl, ctrl);
        io.add_key_event(Key::ModShift, shift);
        io.add_key_event(Key::ModAlt, alt);
        io.add_key_event(Key::ModSuper, logo);

        for &(key, down) in &self.keys {
            io.add_key_event(key, down);
        }
        for &c in &self.chars {
            io.add_input_character(c);
        }
    }
}

/// Keys the GUI needs for navigation and text editing shortcuts.
pub fn map_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::Tab => Key::Tab,
        KeyCode::ArrowLeft => Key::LeftArrow,
        KeyCode::ArrowRight => Key::RightArrow,
        KeyCode::ArrowUp => Key::UpArrow,
        KeyCode::ArrowDown => Key::DownArrow,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::Delete => Key::Delete,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Enter => Key::Enter,
        KeyCode::Escape => Key::Escape,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyC => Key::C,
        KeyCode::KeyV => Key::V,
        KeyCode::KeyX => Key::X,
        KeyCode::KeyY => Key::Y,
        KeyCode::KeyZ => Key::Z,
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn click_within_one_frame_is_reported_down() {
        let mut input = InputState::new();
        input.handle_button(MouseButton::Left, ElementState::Pressed);
        input.handle_button(MouseButton::Left, ElementState::Released);
        assert_eq!(input.take_frame_input().mouse_down, [true, false, false]);
        assert_eq!(input.take_frame_input().mouse_down, [false, false, false]);
    }

    #[test]
    fn held_button_stays_down_across_frames() {
        let mut input = InputState::new();
        input.handle_button(MouseButton::Right, ElementState::Pressed);
        input.take_frame_input();
        input.take_frame_input();
        assert_eq!(input.frame_input().mouse_down, [false, true, false]);
    }

    #[test]
    fn mouse_position_is_scaled_to_framebuffer() {
        let mut input = InputState::new();
        input.set_mouse_pos_scale(PhysicalSize::new(2560, 1440), LogicalSize::new(1280.0, 720.0));
        input.handle_cursor(Some(LogicalPosition::new(10.0, 20.0)));
        assert_eq!(input.frame_input().mouse_pos, Some([20.0, 40.0]));
    }

    #[test]
    fn cursor_leaving_reports_no_mouse() {
        let mut input = InputState::new();
        input.handle_cursor(Some(LogicalPosition::new(10.0, 20.0)));
        input.handle_cursor(None);
        assert_eq!(input.frame_input().mouse_pos, None);
    }

    #[test]
    fn zero_sized_window_keeps_unit_scale() {
        let mut input = InputState::new();
        input.set_mouse_pos_scale(PhysicalSize::new(0, 0), LogicalSize::new(0.0, 0.0));
        input.handle_cursor(Some(LogicalPosition::new(3.0, 4.0)));
        assert_eq!(input.frame_input().mouse_pos, Some([3.0, 4.0]));
    }

    #[test]
    fn wheel_accumulates_until_next_frame() {
        let mut input = InputState::new();
        input.handle_wheel(MouseScrollDelta::LineDelta(0.0, 1.0));
        input.handle_wheel(MouseScrollDelta::LineDelta(0.5, 2.0));
        assert_eq!(input.frame_input().wheel, [0.5, 3.0]);

        assert_eq!(input.take_frame_input().wheel, [0.5, 3.0]);
        assert_eq!(input.frame_input().wheel, [0.0, 0.0]);
    }

    #[test]
    fn pixel_scroll_keeps_idle_axis_still() {
        let mut input = InputState::new();
        input.handle_wheel(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 30.0)));
        assert_eq!(input.frame_input().wheel, [0.0, 0.3]);

        input.take_frame_input();
        input.handle_wheel(MouseScrollDelta::PixelDelta(PhysicalPosition::new(-250.0, 0.0)));
        assert_eq!(input.frame_input().wheel, [-2.5, 0.0]);
    }

    #[test]
    fn input_without_a_drawn_frame_is_kept() {
        let mut input = InputState::new();
        input.handle_key(KeyCode::Backspace, true);
        input.handle_key(KeyCode::Backspace, false);
        input.handle_button(MouseButton::Left, ElementState::Pressed);
        input.handle_button(MouseButton::Left, ElementState::Released);
        input.handle_wheel(MouseScrollDelta::LineDelta(0.0, 1.0));
        input.handle_text("a");
        // Several event batches arrive before the next redraw.
        input.handle_wheel(MouseScrollDelta::LineDelta(0.0, 1.0));

        let frame = input.take_frame_input();
        assert_eq!(frame.keys, vec![(Key::Backspace, true), (Key::Backspace, false)]);
        assert_eq!(frame.mouse_down, [true, false, false]);
        assert_eq!(frame.wheel, [0.0, 2.0]);
        assert_eq!(frame.chars, vec!['a']);
    }

    #[test]
    fn only_mapped_keys_are_forwarded() {
        let mut input = InputState::new();
        input.handle_key(KeyCode::Tab, true);
        input.handle_key(KeyCode::KeyQ, true);
        input.handle_key(KeyCode::KeyZ, false);
        input.handle_text("q\u{8}");
        let frame = input.frame_input();
        assert_eq!(frame.keys, vec![(Key::Tab, true), (Key::Z, false)]);
        assert_eq!(frame.chars, vec!['q']);

        input.take_frame_input();
        assert!(input.frame_input().keys.is_empty());
    }

    #[test]
    fn key_map_covers_editing_keys() {
        let mapped = [
            KeyCode::Tab,
            KeyCode::ArrowLeft,
            KeyCode::ArrowRight,
            KeyCode::ArrowUp,
            KeyCode::ArrowDown,
            KeyCode::Home,
            KeyCode::End,
            KeyCode::Delete,
            KeyCode::Backspace,
            KeyCode::Enter,
            KeyCode::Escape,
            KeyCode::KeyA,
            KeyCode::KeyC,
            KeyCode::KeyV,
            KeyCode::KeyX,
            KeyCode::KeyY,
            KeyCode::KeyZ,
        ];
        assert!(mapped.iter().all(|&code| map_key(code).is_some()));
        assert_eq!(map_key(KeyCode::F1), None);
        assert_eq!(map_key(KeyCode::KeyB), None);
    }
}
