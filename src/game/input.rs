//! Player input surface: discrete actions and per-tick axes

use serde::{Deserialize, Serialize};

use super::weapon::WeaponType;

/// Discrete input actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputAction {
    Jump,
    Crouch,
    Fire,
    Sprint,
    Melee,
    Revolver,
    Shotgun,
    Rifle,
    SwitchWeapon,
    Reload,
    DropWeapon,
}

impl InputAction {
    /// Weapon slot selected by this action, if it is a weapon hotkey
    pub fn weapon_slot(self) -> Option<WeaponType> {
        match self {
            InputAction::Melee => Some(WeaponType::Melee),
            InputAction::Revolver => Some(WeaponType::Revolver),
            InputAction::Shotgun => Some(WeaponType::Shotgun),
            InputAction::Rifle => Some(WeaponType::Rifle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonState {
    Pressed,
    Released,
}

/// A button press or release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub action: InputAction,
    pub state: ButtonState,
}

impl ActionEvent {
    pub fn pressed(action: InputAction) -> Self {
        Self {
            action,
            state: ButtonState::Pressed,
        }
    }

    pub fn released(action: InputAction) -> Self {
        Self {
            action,
            state: ButtonState::Released,
        }
    }
}

/// Continuous axes sampled once per simulation tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisFrame {
    /// Forward (+) / backward (-)
    pub move_forward: f32,
    /// Right (+) / left (-)
    pub move_right: f32,
    /// Absolute yaw delta in degrees (mouse)
    pub turn: f32,
    /// Normalized yaw rate (stick), 1.0 = full turn rate
    pub turn_rate: f32,
    /// Absolute pitch delta in degrees (mouse)
    pub look_up: f32,
    /// Normalized pitch rate (stick)
    pub look_up_rate: f32,
}

impl AxisFrame {
    /// Clamp normalized axes to [-1, 1]; non-finite values become 0
    pub fn sanitized(self) -> Self {
        fn unit(v: f32) -> f32 {
            if v.is_finite() {
                v.clamp(-1.0, 1.0)
            } else {
                0.0
            }
        }
        fn finite(v: f32) -> f32 {
            if v.is_finite() {
                v
            } else {
                0.0
            }
        }

        Self {
            move_forward: unit(self.move_forward),
            move_right: unit(self.move_right),
            turn: finite(self.turn),
            turn_rate: unit(self.turn_rate),
            look_up: finite(self.look_up),
            look_up_rate: unit(self.look_up_rate),
        }
    }

    /// Whether this frame changes the view rotation
    pub fn rotates_view(&self) -> bool {
        self.turn != 0.0 || self.turn_rate != 0.0 || self.look_up != 0.0 || self.look_up_rate != 0.0
    }
}
