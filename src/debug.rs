// Debug parameters and the command table behind the debug panel

use std::time::Duration;
use thiserror::Error;

use crate::material::Color;
use crate::scene::DemoScene;
use crate::tween::Tween;

/// How far a single spin turns the group, in radians.
pub const SPIN_ANGLE: f32 = 10.0;
pub const SPIN_DURATION: Duration = Duration::from_secs(1);

/// Values the panel edits that are not scene-graph fields themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugParams {
    pub color: Color,
    pub sun_color: Color,
}

impl Default for DebugParams {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            sun_color: Color::YELLOW,
        }
    }
}

/// Discriminants index into [`CONTROLS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    Spin,
    CubeColor,
    SunColor,
    GroupX,
    GroupY,
    GroupVisible,
    CubeWireframe,
    SunVisible,
    SunWireframe,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlKind {
    Action,
    Color,
    Range { min: f32, max: f32, step: f32 },
    Toggle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Control {
    pub id: ControlId,
    pub label: &'static str,
    pub kind: ControlKind,
}

const GROUP_OFFSET: ControlKind = ControlKind::Range {
    min: -3.0,
    max: 3.0,
    step: 0.01,
};

/// Every binding the panel exposes, in display order.
pub const CONTROLS: [Control; 9] = [
    Control { id: ControlId::Spin, label: "spin", kind: ControlKind::Action },
    Control { id: ControlId::CubeColor, label: "color", kind: ControlKind::Color },
    Control { id: ControlId::SunColor, label: "sunColor", kind: ControlKind::Color },
    Control { id: ControlId::GroupX, label: "group horizontal", kind: GROUP_OFFSET },
    Control { id: ControlId::GroupY, label: "group vertical", kind: GROUP_OFFSET },
    Control { id: ControlId::GroupVisible, label: "group visible", kind: ControlKind::Toggle },
    Control { id: ControlId::CubeWireframe, label: "group wireframe", kind: ControlKind::Toggle },
    Control { id: ControlId::SunVisible, label: "sun visible", kind: ControlKind::Toggle },
    Control { id: ControlId::SunWireframe, label: "sun wireframe", kind: ControlKind::Toggle },
];

impl ControlId {
    pub fn control(self) -> &'static Control {
        &CONTROLS[self as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlValue {
    Trigger,
    Color(Color),
    Number(f32),
    Flag(bool),
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("control `{label}` does not accept {value:?}")]
    WrongKind { label: &'static str, value: ControlValue },
    #[error("control `{label}` received a non-finite number")]
    NotFinite { label: &'static str },
}

/// A single edit coming from the panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugCommand {
    pub control: ControlId,
    pub value: ControlValue,
}

impl DebugCommand {
    pub fn new(control: ControlId, value: ControlValue) -> Self {
        Self { control, value }
    }

    /// Checks the value against the control's kind. Numbers are clamped to the
    /// range and snapped to its step.
    pub fn validate(&self) -> Result<ControlValue, CommandError> {
        let control = self.control.control();
        match (control.kind, self.value) {
            (ControlKind::Action, ControlValue::Trigger)
            | (ControlKind::Color, ControlValue::Color(_))
            | (ControlKind::Toggle, ControlValue::Flag(_)) => Ok(self.value),
            (ControlKind::Range { min, max, step }, ControlValue::Number(v)) => {
                if !v.is_finite() {
                    return Err(CommandError::NotFinite { label: control.label });
                }
                let snapped = ((v - min) / step).round() * step + min;
                Ok(ControlValue::Number(snapped.clamp(min, max)))
            }
            (_, value) => Err(CommandError::WrongKind {
                label: control.label,
                value,
            }),
        }
    }
}

/// Everything a command may write to.
pub struct DebugTarget<'a> {
    pub scene: &'a mut DemoScene,
    pub params: &'a mut DebugParams,
    pub spin: &'a mut Option<Tween>,
}

impl DebugTarget<'_> {
    /// Reads the current value a control displays.
    pub fn read(&self, control: ControlId) -> ControlValue {
        let demo = &*self.scene;
        let scene = &demo.scene;
        match control {
            ControlId::Spin => ControlValue::Trigger,
            ControlId::CubeColor => ControlValue::Color(self.params.color),
            ControlId::SunColor => ControlValue::Color(self.params.sun_color),
            ControlId::GroupX => ControlValue::Number(scene.node(demo.group).transform.position.x),
            ControlId::GroupY => ControlValue::Number(scene.node(demo.group).transform.position.y),
            ControlId::GroupVisible => ControlValue::Flag(scene.node(demo.group).visible),
            ControlId::CubeWireframe => {
                ControlValue::Flag(scene.material(demo.cube_material).wireframe)
            }
            ControlId::SunVisible => ControlValue::Flag(scene.node(demo.sun).visible),
            ControlId::SunWireframe => {
                ControlValue::Flag(scene.material(demo.sun_material).wireframe)
            }
        }
    }

    /// Validates and applies a command in place.
    pub fn apply(&mut self, command: DebugCommand) -> Result<(), CommandError> {
        let value = command.validate()?;
        let demo = &mut *self.scene;
        let group = demo.group;

        match (command.control, value) {
            (ControlId::Spin, _) => {
                let current = demo.scene.node(group).transform.rotation.y;
                let spin = Tween::by(current, SPIN_ANGLE, SPIN_DURATION);
                log::debug!("spinning group to {:.2} rad", spin.target());
                *self.spin = Some(spin);
            }
            (ControlId::CubeColor, ControlValue::Color(color)) => {
                self.params.color = color;
                demo.scene.material_mut(demo.cube_material).color = self.params.color;
                log::debug!("cube color #{:06x}", color.to_hex());
            }
            (ControlId::SunColor, ControlValue::Color(color)) => {
                self.params.sun_color = color;
                demo.scene.material_mut(demo.sun_material).color = self.params.sun_color;
                log::debug!("sun color #{:06x}", color.to_hex());
            }
            (ControlId::GroupX, ControlValue::Number(x)) => {
                demo.scene.node_mut(group).transform.position.x = x;
            }
            (ControlId::GroupY, ControlValue::Number(y)) => {
                demo.scene.node_mut(group).transform.position.y = y;
            }
            (ControlId::GroupVisible, ControlValue::Flag(on)) => {
                demo.scene.node_mut(group).visible = on;
            }
            (ControlId::CubeWireframe, ControlValue::Flag(on)) => {
                demo.scene.material_mut(demo.cube_material).wireframe = on;
            }
            (ControlId::SunVisible, ControlValue::Flag(on)) => {
                demo.scene.node_mut(demo.sun).visible = on;
            }
            (ControlId::SunWireframe, ControlValue::Flag(on)) => {
                demo.scene.material_mut(demo.sun_material).wireframe = on;
            }
            (id, value) => unreachable!("{id:?} validated to {value:?}"),
        }
        log::debug!("applied {:?} = {:?}", command.control, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::build_scene;
    use approx::assert_abs_diff_eq;

    struct Fixture {
        scene: DemoScene,
        params: DebugParams,
        spin: Option<Tween>,
    }

    impl Fixture {
        fn new() -> Self {
            let params = DebugParams::default();
            Self {
                scene: build_scene(params.color, params.sun_color),
                params,
                spin: None,
            }
        }

        fn target(&mut self) -> DebugTarget<'_> {
            DebugTarget {
                scene: &mut self.scene,
                params: &mut self.params,
                spin: &mut self.spin,
            }
        }
    }

    #[test]
    fn table_has_one_entry_per_control() {
        for control in &CONTROLS {
            assert_eq!(control.id.control(), control);
        }
        let mut labels: Vec<_> = CONTROLS.iter().map(|c| c.label).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), CONTROLS.len());
    }

    #[test]
    fn range_values_are_clamped_and_snapped() {
        let cmd = DebugCommand::new(ControlId::GroupX, ControlValue::Number(7.5));
        assert_eq!(cmd.validate(), Ok(ControlValue::Number(3.0)));

        let cmd = DebugCommand::new(ControlId::GroupY, ControlValue::Number(1.23456));
        let Ok(ControlValue::Number(v)) = cmd.validate() else {
            panic!("expected a number");
        };
        assert_abs_diff_eq!(v, 1.23, epsilon = 1e-5);
    }

    #[test]
    fn rejects_mismatched_and_non_finite_values() {
        let cmd = DebugCommand::new(ControlId::SunVisible, ControlValue::Number(1.0));
        assert!(matches!(
            cmd.validate(),
            Err(CommandError::WrongKind { label: "sun visible", .. })
        ));

        let cmd = DebugCommand::new(ControlId::GroupX, ControlValue::Number(f32::NAN));
        assert_eq!(cmd.validate(), Err(CommandError::NotFinite { label: "group horizontal" }));
    }

    #[test]
    fn cube_color_reaches_shared_material_only() {
        let mut fx = Fixture::new();
        let red = Color::from_hex(0xff0000);
        fx.target()
            .apply(DebugCommand::new(ControlId::CubeColor, ControlValue::Color(red)))
            .unwrap();
        assert_eq!(fx.params.color, red);
        assert_eq!(fx.scene.scene.material(fx.scene.cube_material).color, red);
        assert_eq!(fx.scene.scene.material(fx.scene.sun_material).color, Color::YELLOW);
    }

    #[test]
    fn sun_color_reaches_sun_only() {
        let mut fx = Fixture::new();
        let orange = Color::from_hex(0xff8800);
        fx.target()
            .apply(DebugCommand::new(ControlId::SunColor, ControlValue::Color(orange)))
            .unwrap();
        assert_eq!(fx.scene.scene.material(fx.scene.sun_material).color, orange);
        assert_eq!(fx.scene.scene.material(fx.scene.cube_material).color, Color::WHITE);
    }

    #[test]
    fn toggles_and_sliders_write_through() {
        let mut fx = Fixture::new();
        let commands = [
            DebugCommand::new(ControlId::GroupX, ControlValue::Number(-1.5)),
            DebugCommand::new(ControlId::GroupY, ControlValue::Number(2.0)),
            DebugCommand::new(ControlId::GroupVisible, ControlValue::Flag(false)),
            DebugCommand::new(ControlId::CubeWireframe, ControlValue::Flag(false)),
            DebugCommand::new(ControlId::SunVisible, ControlValue::Flag(false)),
            DebugCommand::new(ControlId::SunWireframe, ControlValue::Flag(false)),
        ];
        let mut target = fx.target();
        for command in commands {
            target.apply(command).unwrap();
            assert_eq!(Ok(target.read(command.control)), command.validate());
        }

        let scene = &fx.scene.scene;
        let group = scene.node(fx.scene.group);
        assert_abs_diff_eq!(group.transform.position.x, -1.5, epsilon = 1e-5);
        assert_abs_diff_eq!(group.transform.position.y, 2.0, epsilon = 1e-5);
        assert!(!group.visible);
        assert!(!scene.material(fx.scene.cube_material).wireframe);
        assert!(!scene.node(fx.scene.sun).visible);
        assert!(!scene.material(fx.scene.sun_material).wireframe);
    }

    #[test]
    fn spin_starts_relative_tween() {
        let mut fx = Fixture::new();
        let group = fx.scene.group;
        fx.scene.scene.node_mut(group).transform.rotation.y = 1.0;
        fx.target()
            .apply(DebugCommand::new(ControlId::Spin, ControlValue::Trigger))
            .unwrap();
        let spin = fx.spin.as_ref().expect("spin tween");
        assert_eq!(spin.target(), 11.0);
        assert_eq!(spin.value(), 1.0);
    }

    #[test]
    fn invalid_command_leaves_scene_untouched() {
        let mut fx = Fixture::new();
        let result = fx
            .target()
            .apply(DebugCommand::new(ControlId::GroupVisible, ControlValue::Trigger));
        assert!(result.is_err());
        assert!(fx.scene.scene.node(fx.scene.group).visible);
    }
}
