//! Unified keyboard + gamepad input per logical player
//!
//! The host hands over one `InputFrame` per tick (raw key states and the
//! connected gamepad slots). Gameplay reads level-triggered (`is_down`) and
//! edge-triggered (`is_just_pressed`) actions, and `late_update` commits the
//! edge-detection snapshot once every system has read the current tick.

use serde::{Deserialize, Serialize};

use crate::Player;

/// Axis deadzone for directional actions
pub const AXIS_DEADZONE: f32 = 0.25;
/// Axes exposed by a gamepad slot
pub const GAMEPAD_AXES: usize = 4;
/// Buttons exposed by a gamepad slot (standard mapping incl. the system button)
pub const GAMEPAD_BUTTONS: usize = 17;
/// System button used to swap gamepad slots between players
pub const SWAP_BUTTON: usize = 16;

/// Abstract actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    /// Launch
    North,
    /// Tether toggle
    East,
    /// Claim
    South,
    West,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::Up,
        Action::Down,
        Action::Left,
        Action::Right,
        Action::North,
        Action::East,
        Action::South,
        Action::West,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// Physical keyboard keys the game binds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    W,
    A,
    S,
    D,
    Q,
    E,
    Space,
    Shift,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Numpad0,
    Numpad1,
    Numpad2,
    Numpad3,
}

impl KeyCode {
    pub const COUNT: usize = 16;

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// Keyboard binding table for one player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    pub up: KeyCode,
    pub down: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub north: KeyCode,
    pub east: KeyCode,
    pub south: KeyCode,
    pub west: KeyCode,
}

impl KeyBindings {
    /// Default left-side layout (WASD)
    pub fn player_one() -> Self {
        Self {
            up: KeyCode::W,
            down: KeyCode::S,
            left: KeyCode::A,
            right: KeyCode::D,
            north: KeyCode::Space,
            east: KeyCode::E,
            south: KeyCode::Shift,
            west: KeyCode::Q,
        }
    }

    /// Default right-side layout (arrows + numpad)
    pub fn player_two() -> Self {
        Self {
            up: KeyCode::ArrowUp,
            down: KeyCode::ArrowDown,
            left: KeyCode::ArrowLeft,
            right: KeyCode::ArrowRight,
            north: KeyCode::Numpad0,
            east: KeyCode::Numpad3,
            south: KeyCode::Numpad1,
            west: KeyCode::Numpad2,
        }
    }

    pub fn key_for(&self, action: Action) -> KeyCode {
        match action {
            Action::Up => self.up,
            Action::Down => self.down,
            Action::Left => self.left,
            Action::Right => self.right,
            Action::North => self.north,
            Action::East => self.east,
            Action::South => self.south,
            Action::West => self.west,
        }
    }
}

/// One boolean per action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionSet([bool; 8]);

impl ActionSet {
    #[inline]
    pub fn get(&self, action: Action) -> bool {
        self.0[action.index()]
    }

    #[inline]
    pub fn set(&mut self, action: Action, value: bool) {
        self.0[action.index()] = value;
    }
}

/// Raw state of one connected gamepad slot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GamepadState {
    pub axes: [f32; GAMEPAD_AXES],
    pub buttons: [bool; GAMEPAD_BUTTONS],
}

impl GamepadState {
    /// Map axes/buttons onto actions (arcade layout: stick for directions,
    /// face buttons 3/1/0/2 for North/East/South/West)
    pub fn mapped(&self) -> ActionSet {
        let mut set = ActionSet::default();
        set.set(Action::Up, self.axes[1] < -AXIS_DEADZONE);
        set.set(Action::Down, self.axes[1] > AXIS_DEADZONE);
        set.set(Action::Left, self.axes[0] < -AXIS_DEADZONE);
        set.set(Action::Right, self.axes[0] > AXIS_DEADZONE);
        set.set(Action::North, self.buttons[3]);
        set.set(Action::East, self.buttons[1]);
        set.set(Action::South, self.buttons[0]);
        set.set(Action::West, self.buttons[2]);
        set
    }
}

/// Everything the host platform reports for one tick
#[derive(Debug, Clone, Default)]
pub struct InputFrame {
    pub keys: [bool; KeyCode::COUNT],
    /// Physical controller slots 0 and 1 (`None` = not connected)
    pub gamepads: [Option<GamepadState>; 2],
}

impl InputFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key(&mut self, key: KeyCode, down: bool) {
        self.keys[key.index()] = down;
    }

    /// Builder-style key press
    pub fn with_key(mut self, key: KeyCode) -> Self {
        self.set_key(key, true);
        self
    }

    pub fn with_gamepad(mut self, slot: usize, pad: GamepadState) -> Self {
        if let Some(entry) = self.gamepads.get_mut(slot) {
            *entry = Some(pad);
        }
        self
    }

    #[inline]
    pub fn key(&self, key: KeyCode) -> bool {
        self.keys[key.index()]
    }
}

/// Input abstraction owned by the game state and lent to consumers
#[derive(Debug, Clone)]
pub struct InputSystem {
    bindings: [KeyBindings; 2],
    frame: InputFrame,
    prev_keys: [ActionSet; 2],
    /// `None` while the player's gamepad was absent at the last commit
    prev_pads: [Option<ActionSet>; 2],
    swapped: bool,
    swap_debounce: bool,
}

impl Default for InputSystem {
    fn default() -> Self {
        Self::new(KeyBindings::player_one(), KeyBindings::player_two())
    }
}

impl InputSystem {
    pub fn new(p1: KeyBindings, p2: KeyBindings) -> Self {
        Self {
            bindings: [p1, p2],
            frame: InputFrame::default(),
            prev_keys: [ActionSet::default(); 2],
            prev_pads: [Some(ActionSet::default()); 2],
            swapped: false,
            swap_debounce: false,
        }
    }

    /// Ingest this tick's raw platform state
    pub fn update(&mut self, frame: &InputFrame) {
        self.frame = frame.clone();
    }

    pub fn is_swapped(&self) -> bool {
        self.swapped
    }

    pub fn bindings(&self, player: Player) -> &KeyBindings {
        &self.bindings[player.index()]
    }

    /// Gamepad currently assigned to a player (respects swap)
    pub fn gamepad(&self, player: Player) -> Option<&GamepadState> {
        let slot = player.index() ^ usize::from(self.swapped);
        self.frame.gamepads[slot].as_ref()
    }

    fn key_actions(&self, player: Player) -> ActionSet {
        let bindings = &self.bindings[player.index()];
        let mut set = ActionSet::default();
        for action in Action::ALL {
            set.set(action, self.frame.key(bindings.key_for(action)));
        }
        set
    }

    /// Level-triggered: keyboard OR gamepad
    pub fn is_down(&self, action: Action, player: Player) -> bool {
        let pad_down = self
            .gamepad(player)
            .map(|pad| pad.mapped().get(action))
            .unwrap_or(false);
        let key_down = self.key_actions(player).get(action);
        pad_down || key_down
    }

    /// Edge-triggered against the last committed snapshot, per source
    pub fn is_just_pressed(&self, action: Action, player: Player) -> bool {
        let idx = player.index();

        let pad_pressed = match (self.gamepad(player), self.prev_pads[idx]) {
            (Some(pad), Some(prev)) => pad.mapped().get(action) && !prev.get(action),
            _ => false,
        };

        let key_pressed =
            self.key_actions(player).get(action) && !self.prev_keys[idx].get(action);

        pad_pressed || key_pressed
    }

    /// Commit the current state as "previous" for the next tick's edges.
    /// Must run exactly once per tick, after all gameplay reads.
    pub fn late_update(&mut self) {
        for player in Player::ALL {
            let idx = player.index();
            self.prev_keys[idx] = self.key_actions(player);
            self.prev_pads[idx] = self.gamepad(player).map(GamepadState::mapped);
        }
    }

    /// Toggle the gamepad slot -> player assignment
    pub fn swap_players(&mut self) {
        self.swapped = !self.swapped;
        self.swap_debounce = true;
        log::info!("Gamepad slots swapped (swapped = {})", self.swapped);
    }

    /// True once per press of the swap button on either pad; a held button
    /// does not repeat until released.
    pub fn poll_swap_button(&mut self) -> bool {
        let pressed = self
            .frame
            .gamepads
            .iter()
            .flatten()
            .any(|pad| pad.buttons[SWAP_BUTTON]);

        if pressed {
            !self.swap_debounce
        } else {
            self.swap_debounce = false;
            false
        }
    }
}
