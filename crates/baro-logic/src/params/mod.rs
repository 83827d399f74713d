//! Designer-tunable parameter objects with named-property tables.
//!
//! Every parameter type registers a static table of properties
//! (name → getter/setter, kind, range). The in-game editor only needs the
//! object-safe [`Editable`] capability to enumerate, read, write and reset
//! properties generically, without knowing the concrete type.
//!
//! ```
//! use baro_logic::params::{Editable, ParamValue, RagdollParams};
//!
//! let mut ragdoll = RagdollParams::default();
//! assert!(ragdoll.property_names().contains(&"joint_scale"));
//! ragdoll.set("joint_scale", ParamValue::Float(0.5)).unwrap();
//! assert_eq!(ragdoll.get("joint_scale").unwrap(), ParamValue::Float(0.5));
//! ragdoll.reset();
//! assert_eq!(ragdoll.joint_scale, 1.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::math::{self, Vec2};

/// Kind of value a property holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    Float,
    /// A float that may be unset (e.g. an angle the gait should not drive).
    OptionalFloat,
    Bool,
    Vector,
}

/// A dynamically typed property value exchanged with the editor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Float(f32),
    OptionalFloat(Option<f32>),
    Bool(bool),
    Vector(Vec2),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::OptionalFloat(_) => ParamKind::OptionalFloat,
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Vector(_) => ParamKind::Vector,
        }
    }
}

/// Errors returned by named-property access.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("unknown property `{0}`")]
    UnknownProperty(String),
    #[error("property `{name}` expects {expected:?}, got {got:?}")]
    WrongKind {
        name: String,
        expected: ParamKind,
        got: ParamKind,
    },
    #[error("value {value} for `{name}` is outside [{min}, {max}]")]
    OutOfRange {
        name: String,
        value: f32,
        min: f32,
        max: f32,
    },
}

/// One entry of a property table.
pub struct Property<T: 'static> {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ParamKind,
    /// Inclusive bounds for float-valued properties.
    pub range: Option<(f32, f32)>,
    pub get: fn(&T) -> ParamValue,
    /// Called only with a value of the declared kind.
    pub set: fn(&mut T, ParamValue),
}

/// Types that expose a static property table.
pub trait PropertyTable: Default + Sized + 'static {
    fn properties() -> &'static [Property<Self>];
}

/// Object-safe named-property capability used by the parameter editor.
pub trait Editable {
    fn property_names(&self) -> Vec<&'static str>;
    fn get(&self, name: &str) -> Result<ParamValue, ParamError>;
    fn set(&mut self, name: &str, value: ParamValue) -> Result<(), ParamError>;
    fn default_value(&self, name: &str) -> Result<ParamValue, ParamError>;
    /// Restore every table property to its default. Data outside the table
    /// (limb lists, foot angle maps) is kept.
    fn reset(&mut self);
}

fn find<T: PropertyTable>(name: &str) -> Result<&'static Property<T>, ParamError> {
    T::properties()
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| ParamError::UnknownProperty(name.to_string()))
}

fn check_value<T>(property: &Property<T>, value: ParamValue) -> Result<(), ParamError> {
    if value.kind() != property.kind {
        return Err(ParamError::WrongKind {
            name: property.name.to_string(),
            expected: property.kind,
            got: value.kind(),
        });
    }
    let scalar = match value {
        ParamValue::Float(v) => Some(v),
        ParamValue::OptionalFloat(v) => v,
        _ => None,
    };
    if let (Some(v), Some((min, max))) = (scalar, property.range) {
        if !v.is_finite() || v < min || v > max {
            return Err(ParamError::OutOfRange {
                name: property.name.to_string(),
                value: v,
                min,
                max,
            });
        }
    }
    Ok(())
}

impl<T: PropertyTable> Editable for T {
    fn property_names(&self) -> Vec<&'static str> {
        T::properties().iter().map(|p| p.name).collect()
    }

    fn get(&self, name: &str) -> Result<ParamValue, ParamError> {
        let property = find::<T>(name)?;
        Ok((property.get)(self))
    }

    fn set(&mut self, name: &str, value: ParamValue) -> Result<(), ParamError> {
        let property = find::<T>(name)?;
        check_value(property, value)?;
        (property.set)(self, value);
        Ok(())
    }

    fn default_value(&self, name: &str) -> Result<ParamValue, ParamError> {
        let property = find::<T>(name)?;
        Ok((property.get)(&T::default()))
    }

    fn reset(&mut self) {
        let defaults = T::default();
        for property in T::properties() {
            (property.set)(self, (property.get)(&defaults));
        }
    }
}

/// Degrees → radians for an optional designer angle; NaN falls back to 0.
pub fn angle_radians(degrees: Option<f32>) -> Option<f32> {
    degrees.map(|d| math::valid_or_zero(d.to_radians()))
}

macro_rules! float_property {
    ($ty:ty, $name:literal, $desc:literal, [$min:expr, $max:expr], $($field:ident).+) => {
        $crate::params::Property::<$ty> {
            name: $name,
            description: $desc,
            kind: $crate::params::ParamKind::Float,
            range: Some(($min, $max)),
            get: |p: &$ty| $crate::params::ParamValue::Float(p.$($field).+),
            set: |p: &mut $ty, v: $crate::params::ParamValue| {
                if let $crate::params::ParamValue::Float(v) = v {
                    p.$($field).+ = v;
                }
            },
        }
    };
}

macro_rules! angle_property {
    ($ty:ty, $name:literal, $desc:literal, $($field:ident).+) => {
        $crate::params::Property::<$ty> {
            name: $name,
            description: $desc,
            kind: $crate::params::ParamKind::OptionalFloat,
            range: Some((-360.0, 360.0)),
            get: |p: &$ty| $crate::params::ParamValue::OptionalFloat(p.$($field).+),
            set: |p: &mut $ty, v: $crate::params::ParamValue| {
                if let $crate::params::ParamValue::OptionalFloat(v) = v {
                    p.$($field).+ = v;
                }
            },
        }
    };
}

macro_rules! bool_property {
    ($ty:ty, $name:literal, $desc:literal, $($field:ident).+) => {
        $crate::params::Property::<$ty> {
            name: $name,
            description: $desc,
            kind: $crate::params::ParamKind::Bool,
            range: None,
            get: |p: &$ty| $crate::params::ParamValue::Bool(p.$($field).+),
            set: |p: &mut $ty, v: $crate::params::ParamValue| {
                if let $crate::params::ParamValue::Bool(v) = v {
                    p.$($field).+ = v;
                }
            },
        }
    };
}

macro_rules! vector_property {
    ($ty:ty, $name:literal, $desc:literal, $($field:ident).+) => {
        $crate::params::Property::<$ty> {
            name: $name,
            description: $desc,
            kind: $crate::params::ParamKind::Vector,
            range: None,
            get: |p: &$ty| $crate::params::ParamValue::Vector(p.$($field).+),
            set: |p: &mut $ty, v: $crate::params::ParamValue| {
                if let $crate::params::ParamValue::Vector(v) = v {
                    p.$($field).+ = v;
                }
            },
        }
    };
}

pub(crate) use angle_property;
pub(crate) use bool_property;
pub(crate) use float_property;
pub(crate) use vector_property;

// submodules come after the table macros they use
pub mod animation;
pub mod ragdoll;

pub use animation::{
    AnimationParams, AnimationSet, AnimationType, FishGroundedParams, FishSwimParams,
    HumanGroundedParams, HumanSwimParams,
};
pub use ragdoll::{JointParams, LimbParams, LimbType, RagdollParams};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_property() {
        let params = RagdollParams::default();
        assert_eq!(
            params.get("no_such_thing"),
            Err(ParamError::UnknownProperty("no_such_thing".into()))
        );
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let mut params = RagdollParams::default();
        let err = params.set("joint_scale", ParamValue::Bool(true)).unwrap_err();
        assert!(matches!(err, ParamError::WrongKind { .. }));
        assert_eq!(params.joint_scale, 1.0);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut params = RagdollParams::default();
        let err = params.set("joint_scale", ParamValue::Float(-1.0)).unwrap_err();
        assert!(matches!(err, ParamError::OutOfRange { .. }));
        let err = params
            .set("joint_scale", ParamValue::Float(f32::NAN))
            .unwrap_err();
        assert!(matches!(err, ParamError::OutOfRange { .. }));
    }

    #[test]
    fn test_default_value_lookup() {
        let mut params = RagdollParams::default();
        params.set("limb_scale", ParamValue::Float(2.0)).unwrap();
        assert_eq!(
            params.default_value("limb_scale").unwrap(),
            ParamValue::Float(1.0)
        );
    }

    #[test]
    fn test_angle_radians_nan_falls_back_to_zero() {
        assert_eq!(angle_radians(Some(f32::NAN)), Some(0.0));
        assert_eq!(angle_radians(None), None);
        let r = angle_radians(Some(180.0)).unwrap();
        assert!((r - std::f32::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn test_generic_editor_walk() {
        // the editor walks any parameter object through the trait object
        let mut ragdoll = RagdollParams::default();
        let editable: &mut dyn Editable = &mut ragdoll;
        for name in editable.property_names() {
            let value = editable.get(name).unwrap();
            editable.set(name, value).unwrap();
        }
    }
}
