//! Field catalog
//!
//! The single source of truth for every field the daemon exposes: its wire
//! name, direction, which parser its responses go through, and any argument
//! constraints the client checks before writing to the wire. Loaded once,
//! immutable for the process lifetime.
//!
//! Some fields only mean anything on one hardware revision of the power
//! module. The catalog marks those informationally but the client never
//! rejects calls to them; the daemon is the authority on field availability.

use crate::error::{Error, Result};
use crate::parse::ParserKind;

/// Whether a field is queried, mutated, or both
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Get,
    Set,
    Both,
}

/// Hardware revision a field is specific to (informational only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revision {
    V2,
    V3,
}

/// Inclusive numeric bounds on a set argument
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

/// One entry of the field catalog
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Exact token the wire protocol uses for this field
    pub name: &'static str,
    pub direction: Direction,
    /// Parser applied to get responses (set responses always go through Done)
    pub parser: ParserKind,
    /// Argument bounds checked client-side before sending
    pub bounds: Option<Bounds>,
    /// Hardware revision this field is specific to, when any
    pub revision: Option<Revision>,
    /// Lenient get: parse failure yields an absent value instead of an error
    pub lenient: bool,
}

impl FieldSpec {
    const fn get(name: &'static str, parser: ParserKind) -> Self {
        Self {
            name,
            direction: Direction::Get,
            parser,
            bounds: None,
            revision: None,
            lenient: false,
        }
    }

    const fn set(name: &'static str) -> Self {
        Self {
            name,
            direction: Direction::Set,
            parser: ParserKind::Done,
            bounds: None,
            revision: None,
            lenient: false,
        }
    }

    const fn both(name: &'static str, parser: ParserKind) -> Self {
        Self {
            name,
            direction: Direction::Both,
            parser,
            bounds: None,
            revision: None,
            lenient: false,
        }
    }

    const fn bounds(mut self, min: f64, max: f64) -> Self {
        self.bounds = Some(Bounds { min, max });
        self
    }

    const fn revision(mut self, revision: Revision) -> Self {
        self.revision = Some(revision);
        self
    }

    const fn lenient(mut self) -> Self {
        self.lenient = true;
        self
    }

    /// Check a numeric set argument against this field's declared bounds
    pub fn check_bounds(&self, value: f64) -> Result<()> {
        if let Some(Bounds { min, max }) = self.bounds {
            if value < min || value > max {
                return Err(Error::invalid_argument(
                    self.name,
                    format!("{value} outside {min}..={max}"),
                ));
            }
        }
        Ok(())
    }
}

/// Every field the daemon exposes
pub const FIELDS: &[FieldSpec] = &[
    // Identity
    FieldSpec::get("version", ParserKind::Text),
    FieldSpec::get("model", ParserKind::Text),
    FieldSpec::get("fireware_version", ParserKind::Text).revision(Revision::V3),
    // Battery
    FieldSpec::get("battery", ParserKind::Float),
    FieldSpec::get("battery_v", ParserKind::Float),
    FieldSpec::get("battery_i", ParserKind::Float),
    FieldSpec::get("battery_led_amount", ParserKind::Int).revision(Revision::V2),
    FieldSpec::get("battery_power_plugged", ParserKind::Bool),
    FieldSpec::get("battery_allow_charging", ParserKind::Bool),
    FieldSpec::get("battery_charging_range", ParserKind::Text).lenient(),
    FieldSpec::get("battery_charging", ParserKind::Bool),
    FieldSpec::get("battery_input_protect_enabled", ParserKind::Bool),
    FieldSpec::get("battery_output_enabled", ParserKind::Bool),
    FieldSpec::get("full_charge_duration", ParserKind::Text).lenient(),
    FieldSpec::get("safe_shutdown_level", ParserKind::Float),
    FieldSpec::get("safe_shutdown_delay", ParserKind::Int),
    FieldSpec::get("auto_power_on", ParserKind::Bool),
    FieldSpec::get("input_protect", ParserKind::Bool),
    FieldSpec::get("soft_poweroff", ParserKind::Bool).revision(Revision::V3),
    FieldSpec::get("temperature", ParserKind::Float),
    // Clock
    FieldSpec::get("system_time", ParserKind::Text),
    FieldSpec::get("rtc_time", ParserKind::Text),
    FieldSpec::get("rtc_alarm_time", ParserKind::Text).lenient(),
    FieldSpec::get("rtc_alarm_enabled", ParserKind::Bool),
    FieldSpec::get("alarm_repeat", ParserKind::Int),
    // Button
    FieldSpec::get("button_enable", ParserKind::Bool),
    FieldSpec::get("button_shell", ParserKind::Text),
    // Auth
    FieldSpec::get("auth_username", ParserKind::Text),
    FieldSpec::get("anti_mistouch", ParserKind::Bool).revision(Revision::V3),
    // Battery mutations
    FieldSpec::set("set_battery_charging_range").bounds(0.0, 100.0),
    FieldSpec::set("set_input_protect"),
    FieldSpec::set("set_battery_output"),
    FieldSpec::set("set_full_charge_duration"),
    FieldSpec::set("set_allow_charging"),
    FieldSpec::set("set_safe_shutdown_level").bounds(0.0, 60.0),
    FieldSpec::set("set_safe_shutdown_delay"),
    FieldSpec::set("set_auto_power_on"),
    FieldSpec::set("force_shutdown"),
    FieldSpec::set("set_soft_poweroff").revision(Revision::V3),
    // Clock mutations
    FieldSpec::set("rtc_pi2rtc"),
    FieldSpec::set("rtc_rtc2pi"),
    FieldSpec::set("rtc_web"),
    FieldSpec::set("rtc_alarm_set"),
    FieldSpec::set("rtc_alarm_disable"),
    FieldSpec::both("rtc_adjust_ppm", ParserKind::Int)
        .bounds(-500.0, 500.0)
        .revision(Revision::V3),
    // Button mutations
    FieldSpec::set("set_button_enable"),
    FieldSpec::set("set_button_shell"),
    // Auth mutations
    FieldSpec::set("set_auth"),
    FieldSpec::set("set_anti_mistouch").revision(Revision::V3),
];

/// Look up a field by wire name
pub fn lookup(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|spec| spec.name == name)
}

/// Validate a charging range pair: `0.0 <= lower < upper <= 100.0`
pub fn check_charging_range(lower: f64, upper: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&lower) || !(0.0..=100.0).contains(&upper) || lower >= upper {
        return Err(Error::invalid_argument(
            "set_battery_charging_range",
            format!("need 0.0 <= lower < upper <= 100.0, got {lower},{upper}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_fields() {
        let battery = lookup("battery").unwrap();
        assert_eq!(battery.parser, ParserKind::Float);
        assert_eq!(battery.direction, Direction::Get);

        let ppm = lookup("rtc_adjust_ppm").unwrap();
        assert_eq!(ppm.direction, Direction::Both);
        assert_eq!(ppm.parser, ParserKind::Int);

        assert!(lookup("no_such_field").is_none());
    }

    #[test]
    fn test_wire_names_are_unique() {
        for (i, spec) in FIELDS.iter().enumerate() {
            for other in &FIELDS[i + 1..] {
                assert_ne!(spec.name, other.name, "duplicate catalog entry");
            }
        }
    }

    #[test]
    fn test_set_fields_use_done_parser() {
        for spec in FIELDS {
            if spec.direction == Direction::Set {
                assert_eq!(spec.parser, ParserKind::Done, "{}", spec.name);
            }
        }
    }

    #[test]
    fn test_lenient_fields() {
        let lenient: Vec<_> = FIELDS
            .iter()
            .filter(|spec| spec.lenient)
            .map(|spec| spec.name)
            .collect();
        assert_eq!(
            lenient,
            [
                "battery_charging_range",
                "full_charge_duration",
                "rtc_alarm_time"
            ]
        );
    }

    #[test]
    fn test_check_bounds() {
        let level = lookup("set_safe_shutdown_level").unwrap();
        assert!(level.check_bounds(30.0).is_ok());
        assert!(level.check_bounds(0.0).is_ok());
        assert!(level.check_bounds(60.0).is_ok());
        assert!(matches!(
            level.check_bounds(60.1),
            Err(Error::InvalidArgument { .. })
        ));

        let ppm = lookup("rtc_adjust_ppm").unwrap();
        assert!(ppm.check_bounds(-500.0).is_ok());
        assert!(ppm.check_bounds(501.0).is_err());

        // No declared bounds means anything goes
        let delay = lookup("set_safe_shutdown_delay").unwrap();
        assert!(delay.check_bounds(1e9).is_ok());
    }

    #[test]
    fn test_check_charging_range() {
        assert!(check_charging_range(60.0, 80.0).is_ok());
        assert!(check_charging_range(0.0, 100.0).is_ok());
        assert!(check_charging_range(80.0, 60.0).is_err());
        assert!(check_charging_range(60.0, 60.0).is_err());
        assert!(check_charging_range(-1.0, 80.0).is_err());
        assert!(check_charging_range(60.0, 100.5).is_err());
    }

    #[test]
    fn test_revision_markers_are_informational() {
        let spec = lookup("soft_poweroff").unwrap();
        assert_eq!(spec.revision, Some(Revision::V3));
        let spec = lookup("battery_led_amount").unwrap();
        assert_eq!(spec.revision, Some(Revision::V2));
    }
}
