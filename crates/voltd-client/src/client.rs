//! Typed client for the voltd daemon
//!
//! [`VoltdClient`] owns the command connection and, unless configured
//! command-only, the event connection with its listener task. Every field
//! accessor goes through the field catalog for its wire name and parser;
//! argument constraints the catalog declares are checked before anything is
//! written to the wire.

use crate::command::CommandClient;
use crate::config::ClientConfig;
use crate::events::{EventListener, HandlerRegistry};
use chrono::{DateTime, FixedOffset, TimeZone};
use std::path::Path;
use std::sync::Arc;
use voltd_protocol::{check_charging_range, lookup, Error, Result, TapEvent};

fn wire_bool(enable: bool) -> &'static str {
    if enable {
        "true"
    } else {
        "false"
    }
}

fn check_bounds(field: &str, value: f64) -> Result<()> {
    match lookup(field) {
        Some(spec) => spec.check_bounds(value),
        None => Err(Error::configuration(format!(
            "field {field} is not in the catalog"
        ))),
    }
}

fn parse_range_bound(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    trimmed
        .parse::<f64>()
        .map_err(|_| Error::malformed(trimmed, "not a valid float"))
}

/// Client handle for the voltd power management daemon
///
/// Cheap to share behind an [`Arc`]; command exchanges are serialized
/// internally so concurrent calls from multiple tasks are safe.
pub struct VoltdClient {
    command: CommandClient,
    registry: Arc<HandlerRegistry>,
    listener: Option<EventListener>,
}

impl VoltdClient {
    /// Connect to the daemon at the default socket path, with events
    pub async fn connect() -> Result<Self> {
        Self::connect_with(ClientConfig::default()).await
    }

    /// Connect to the daemon over a Unix socket, with events
    pub async fn connect_unix(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with(ClientConfig {
            endpoint: crate::Endpoint::Unix(path.as_ref().to_path_buf()),
            ..ClientConfig::default()
        })
        .await
    }

    /// Connect to the daemon over TCP, with events
    ///
    /// The daemon's default port is [`voltd_protocol::DEFAULT_TCP_PORT`].
    pub async fn connect_tcp(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::connect_with(ClientConfig {
            endpoint: crate::Endpoint::Tcp(host.into(), port),
            ..ClientConfig::default()
        })
        .await
    }

    /// Connect with explicit configuration
    ///
    /// With `events` disabled only the command connection is opened and
    /// tap handler registration is rejected.
    pub async fn connect_with(config: ClientConfig) -> Result<Self> {
        let command_conn = config.endpoint.dial().await?;
        let command = CommandClient::new(command_conn, config.read_timeout);
        let registry = Arc::new(HandlerRegistry::default());

        let listener = if config.events {
            let event_conn = config.endpoint.dial().await?;
            Some(EventListener::spawn(event_conn, registry.clone()))
        } else {
            None
        };

        Ok(Self {
            command,
            registry,
            listener,
        })
    }

    /// Access the underlying command engine
    ///
    /// For fields the daemon grows before this crate does; the typed
    /// accessors below cover the catalog.
    pub fn command(&self) -> &CommandClient {
        &self.command
    }

    /// Register a callback for a tap kind
    ///
    /// Handlers run on the listener task in registration order, each
    /// isolated from the others' panics. Fails when the client was
    /// connected without an event connection.
    pub fn register_tap_handler(
        &self,
        kind: TapEvent,
        handler: impl Fn() + Send + Sync + 'static,
    ) -> Result<()> {
        if self.listener.is_none() {
            return Err(Error::configuration(
                "event connection is not configured",
            ));
        }
        self.registry.register(kind, Box::new(handler));
        Ok(())
    }

    /// Stop the event listener, close both connections and join the task
    pub async fn shutdown(mut self) {
        if let Some(listener) = self.listener.take() {
            listener.stop().await;
        }
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Daemon version
    pub async fn version(&self) -> Result<String> {
        self.command.get("version").await?.into_text()
    }

    /// Power module model
    pub async fn model(&self) -> Result<String> {
        self.command.get("model").await?.into_text()
    }

    /// Firmware version (revision 3 modules)
    pub async fn firmware_version(&self) -> Result<String> {
        self.command.get("fireware_version").await?.into_text()
    }

    // =========================================================================
    // Battery
    // =========================================================================

    /// Battery level (%)
    pub async fn battery_level(&self) -> Result<f64> {
        self.command.get("battery").await?.into_float()
    }

    /// Battery voltage (V)
    pub async fn battery_voltage(&self) -> Result<f64> {
        self.command.get("battery_v").await?.into_float()
    }

    /// Battery current (A)
    pub async fn battery_current(&self) -> Result<f64> {
        self.command.get("battery_i").await?.into_float()
    }

    /// Number of battery level LEDs (revision 2 modules)
    pub async fn battery_led_amount(&self) -> Result<i64> {
        self.command.get("battery_led_amount").await?.into_int()
    }

    /// Whether external power is plugged in
    pub async fn battery_power_plugged(&self) -> Result<bool> {
        self.command.get("battery_power_plugged").await?.into_bool()
    }

    /// Whether charging is currently allowed
    pub async fn battery_allow_charging(&self) -> Result<bool> {
        self.command
            .get("battery_allow_charging")
            .await?
            .into_bool()
    }

    /// Battery charging range as a `(lower, upper)` pair in %
    ///
    /// Absent when the daemon reports no range; only a comma-separated pair
    /// yields a value.
    pub async fn battery_charging_range(&self) -> Result<Option<(f64, f64)>> {
        let text = self
            .command
            .get("battery_charging_range")
            .await?
            .into_text()?;
        let parts: Vec<&str> = text.split(',').collect();
        if parts.len() < 2 || parts[0].is_empty() {
            return Ok(None);
        }
        Ok(Some((
            parse_range_bound(parts[0])?,
            parse_range_bound(parts[1])?,
        )))
    }

    /// Whether the battery is charging
    pub async fn battery_charging(&self) -> Result<bool> {
        self.command.get("battery_charging").await?.into_bool()
    }

    /// Whether battery input protection is enabled
    pub async fn battery_input_protect_enabled(&self) -> Result<bool> {
        self.command
            .get("battery_input_protect_enabled")
            .await?
            .into_bool()
    }

    /// Whether battery output is enabled
    pub async fn battery_output_enabled(&self) -> Result<bool> {
        self.command
            .get("battery_output_enabled")
            .await?
            .into_bool()
    }

    /// Seconds to keep charging after the battery reads full
    ///
    /// Absent when the daemon's answer is not a whole number.
    pub async fn battery_full_charge_duration(&self) -> Result<Option<i64>> {
        let text = self
            .command
            .get("full_charge_duration")
            .await?
            .into_text()?;
        Ok(text.parse::<i64>().ok())
    }

    /// Battery level (%) below which the daemon powers the host off
    pub async fn battery_safe_shutdown_level(&self) -> Result<f64> {
        self.command.get("safe_shutdown_level").await?.into_float()
    }

    /// Seconds the daemon waits before disabling output on safe shutdown
    pub async fn battery_safe_shutdown_delay(&self) -> Result<i64> {
        self.command.get("safe_shutdown_delay").await?.into_int()
    }

    /// Whether the module powers back on when external power returns
    pub async fn battery_auto_power_on(&self) -> Result<bool> {
        self.command.get("auto_power_on").await?.into_bool()
    }

    /// Whether input protection is enabled
    pub async fn battery_input_protect(&self) -> Result<bool> {
        self.command.get("input_protect").await?.into_bool()
    }

    /// Whether soft poweroff is enabled (revision 3 modules)
    pub async fn battery_soft_poweroff(&self) -> Result<bool> {
        self.command.get("soft_poweroff").await?.into_bool()
    }

    /// Power module temperature (°C)
    pub async fn temperature(&self) -> Result<f64> {
        self.command.get("temperature").await?.into_float()
    }

    /// Set the charging range; `0.0 <= lower < upper <= 100.0`
    pub async fn set_battery_charging_range(&self, lower: f64, upper: f64) -> Result<()> {
        check_charging_range(lower, upper)?;
        let arg = format!("{lower},{upper}");
        self.command
            .set("set_battery_charging_range", &[&arg])
            .await
    }

    /// Enable or disable battery input protection
    pub async fn set_battery_input_protect(&self, enable: bool) -> Result<()> {
        self.command
            .set("set_input_protect", &[wire_bool(enable)])
            .await
    }

    /// Enable or disable battery output
    pub async fn set_battery_output(&self, enable: bool) -> Result<()> {
        self.command
            .set("set_battery_output", &[wire_bool(enable)])
            .await
    }

    /// Set seconds to keep charging after the battery reads full
    pub async fn set_battery_full_charge_duration(&self, seconds: i64) -> Result<()> {
        self.command
            .set("set_full_charge_duration", &[&seconds.to_string()])
            .await
    }

    /// Allow or disallow charging
    pub async fn set_battery_allow_charging(&self, enable: bool) -> Result<()> {
        self.command
            .set("set_allow_charging", &[wire_bool(enable)])
            .await
    }

    /// Set the safe shutdown level (%); must be within `0.0..=60.0`
    pub async fn set_battery_safe_shutdown_level(&self, level: f64) -> Result<()> {
        check_bounds("set_safe_shutdown_level", level)?;
        self.command
            .set("set_safe_shutdown_level", &[&level.to_string()])
            .await
    }

    /// Set seconds to wait before disabling output on safe shutdown
    pub async fn set_battery_safe_shutdown_delay(&self, delay: i64) -> Result<()> {
        self.command
            .set("set_safe_shutdown_delay", &[&delay.to_string()])
            .await
    }

    /// Enable or disable auto power on
    pub async fn set_battery_auto_power_on(&self, enable: bool) -> Result<()> {
        self.command
            .set("set_auto_power_on", &[wire_bool(enable)])
            .await
    }

    /// Disable battery output and shut the module down
    pub async fn force_shutdown(&self) -> Result<()> {
        self.command.set("force_shutdown", &[]).await
    }

    /// Enable or disable soft poweroff (revision 3 modules)
    pub async fn set_battery_soft_poweroff(&self, enable: bool) -> Result<()> {
        self.command
            .set("set_soft_poweroff", &[wire_bool(enable)])
            .await
    }

    // =========================================================================
    // Clock
    // =========================================================================

    /// Host system time as reported by the daemon
    pub async fn system_time(&self) -> Result<DateTime<FixedOffset>> {
        let text = self.command.get("system_time").await?.into_text()?;
        DateTime::parse_from_rfc3339(&text)
            .map_err(|e| Error::malformed(text, format!("not an RFC 3339 timestamp: {e}")))
    }

    /// Real-time clock time
    pub async fn rtc_time(&self) -> Result<DateTime<FixedOffset>> {
        let text = self.command.get("rtc_time").await?.into_text()?;
        DateTime::parse_from_rfc3339(&text)
            .map_err(|e| Error::malformed(text, format!("not an RFC 3339 timestamp: {e}")))
    }

    /// RTC alarm time; the date part carries no meaning
    ///
    /// Absent when no alarm is set (the daemon answers with something that
    /// is not a timestamp).
    pub async fn rtc_alarm_time(&self) -> Result<Option<DateTime<FixedOffset>>> {
        let text = self.command.get("rtc_alarm_time").await?.into_text()?;
        Ok(DateTime::parse_from_rfc3339(&text).ok())
    }

    /// Whether the RTC alarm is enabled
    pub async fn rtc_alarm_enabled(&self) -> Result<bool> {
        self.command.get("rtc_alarm_enabled").await?.into_bool()
    }

    /// RTC drift adjustment in parts per million (revision 3 modules)
    pub async fn rtc_adjust_ppm(&self) -> Result<i64> {
        self.command.get("rtc_adjust_ppm").await?.into_int()
    }

    /// Alarm weekday repeat bitmask; bits 0-6 are Sunday through Saturday
    pub async fn rtc_alarm_repeat(&self) -> Result<i64> {
        self.command.get("alarm_repeat").await?.into_int()
    }

    /// Copy host time into the RTC
    pub async fn rtc_pi2rtc(&self) -> Result<()> {
        self.command.set("rtc_pi2rtc", &[]).await
    }

    /// Copy RTC time into the host clock
    pub async fn rtc_rtc2pi(&self) -> Result<()> {
        self.command.set("rtc_rtc2pi", &[]).await
    }

    /// Replace RTC and host time with network time
    pub async fn rtc_web(&self) -> Result<()> {
        self.command.set("rtc_web", &[]).await
    }

    /// Set the RTC alarm
    ///
    /// The date part of `time` is ignored by the daemon; `weekday_repeat`
    /// bits 0-6 select Sunday through Saturday.
    pub async fn rtc_alarm_set<Tz: TimeZone>(
        &self,
        time: &DateTime<Tz>,
        weekday_repeat: u8,
    ) -> Result<()>
    where
        Tz::Offset: std::fmt::Display,
    {
        let stamp = time.to_rfc3339();
        self.command
            .set("rtc_alarm_set", &[&stamp, &weekday_repeat.to_string()])
            .await
    }

    /// Disable the RTC alarm
    pub async fn rtc_alarm_disable(&self) -> Result<()> {
        self.command.set("rtc_alarm_disable", &[]).await
    }

    /// Adjust RTC drift; `ppm` must be within `-500.0..=500.0`
    pub async fn set_rtc_adjust_ppm(&self, ppm: f64) -> Result<()> {
        check_bounds("rtc_adjust_ppm", ppm)?;
        self.command
            .set("rtc_adjust_ppm", &[&ppm.to_string()])
            .await
    }

    // =========================================================================
    // Button
    // =========================================================================

    /// Whether the given tap kind triggers its configured action
    pub async fn tap_enabled(&self, tap: TapEvent) -> Result<bool> {
        let resp = self
            .command
            .execute_raw(&format!("get button_enable {tap}"), "button_enable")
            .await?;
        Ok(String::from_utf8_lossy(&resp)
            .to_lowercase()
            .contains("true"))
    }

    /// Shell command configured for the given tap kind
    pub async fn tap_shell(&self, tap: TapEvent) -> Result<String> {
        let text = self
            .command
            .get_with_arg("button_shell", tap.as_wire())
            .await?
            .into_text()?;
        // The daemon echoes the tap selector ahead of the script
        match text.find(tap.as_wire()) {
            Some(pos) => Ok(text[pos..].to_string()),
            None => Ok(text),
        }
    }

    /// Enable or disable a tap kind
    pub async fn set_tap_enable(&self, tap: TapEvent, enable: bool) -> Result<()> {
        let flag = if enable { "1" } else { "0" };
        self.command
            .set("set_button_enable", &[tap.as_wire(), flag])
            .await
    }

    /// Set the shell command run for a tap kind
    pub async fn set_tap_shell(&self, tap: TapEvent, shell: &str) -> Result<()> {
        self.command
            .set("set_button_shell", &[tap.as_wire(), shell])
            .await
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// HTTP auth username configured on the daemon
    pub async fn auth_username(&self) -> Result<String> {
        self.command.get("auth_username").await?.into_text()
    }

    /// Set HTTP auth credentials
    pub async fn set_auth(&self, username: &str, password: &str) -> Result<()> {
        self.command.set("set_auth", &[username, password]).await
    }

    /// Whether power button anti-mistouch is enabled (revision 3 modules)
    pub async fn anti_mistouch(&self) -> Result<bool> {
        self.command.get("anti_mistouch").await?.into_bool()
    }

    /// Enable or disable anti-mistouch (revision 3 modules)
    pub async fn set_anti_mistouch(&self, enable: bool) -> Result<()> {
        self.command
            .set("set_anti_mistouch", &[wire_bool(enable)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandClient;

    /// Client over an inert in-memory pipe; only pre-wire validation paths
    /// are exercised here
    fn disconnected_client() -> VoltdClient {
        let (_daemon_side, client_side) = tokio::io::duplex(64);
        VoltdClient {
            command: CommandClient::new(Box::new(client_side), None),
            registry: Arc::new(crate::events::HandlerRegistry::default()),
            listener: None,
        }
    }

    #[tokio::test]
    async fn test_charging_range_checked_before_wire() {
        let client = disconnected_client();
        let err = client
            .set_battery_charging_range(80.0, 60.0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_safe_shutdown_level_checked_before_wire() {
        let client = disconnected_client();
        let err = client
            .set_battery_safe_shutdown_level(75.0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_rtc_adjust_ppm_checked_before_wire() {
        let client = disconnected_client();
        let err = client.set_rtc_adjust_ppm(1000.0).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_register_without_event_connection_is_rejected() {
        let client = disconnected_client();
        let err = client
            .register_tap_handler(TapEvent::Single, || {})
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_wire_bool() {
        assert_eq!(wire_bool(true), "true");
        assert_eq!(wire_bool(false), "false");
    }
}
