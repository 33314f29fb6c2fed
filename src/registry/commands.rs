//! Built-in command table.
//!
//! Invocation templates return the argv handed to the bridge after the
//! optional `-s <serial>` selector. Values that end up inside the device-side
//! shell (`adb shell` re-joins its arguments) are single-quoted there.

use super::{
    COORD_MAX, CommandSpec, DURATION_MAX_MS, ParamDefault, ParamSpec, TEXT_MAX_LEN, TextFormat,
};
use crate::validate::ValidatedArgs;

const ON_OFF: &[&str] = &["on", "off"];
const VOLUME_ACTIONS: &[&str] = &["increase", "decrease", "mute"];
const MUSIC_ACTIONS: &[&str] = &["play", "pause", "play_pause", "next", "previous", "stop"];
const SETTINGS_NAMESPACES: &[&str] = &["system", "secure", "global"];

const TORCH_NODE: &str = "/sys/class/leds/flashlight/brightness";

fn shell(parts: &[&str]) -> Vec<String> {
    std::iter::once("shell")
        .chain(parts.iter().copied())
        .map(String::from)
        .collect()
}

/// Quote a value for the device-side `sh`.
fn remote_quote(s: &str) -> String {
    shell_words::quote(s).into_owned()
}

fn enable_word(state: &str) -> &'static str {
    if state == "on" { "enable" } else { "disable" }
}

fn enabled_word(state: &str) -> &'static str {
    if state == "on" { "enabled" } else { "disabled" }
}

fn volume_keycode(action: &str) -> &'static str {
    match action {
        "increase" => "24",
        "decrease" => "25",
        _ => "164",
    }
}

fn music_keycode(action: &str) -> &'static str {
    match action {
        "play" => "126",
        "pause" => "127",
        "play_pause" => "85",
        "next" => "87",
        "previous" => "88",
        _ => "86",
    }
}

fn coord(name: &'static str, description: &'static str) -> ParamSpec {
    ParamSpec::integer(name, 0, COORD_MAX, description)
}

fn duration(default_ms: i64) -> ParamSpec {
    ParamSpec::integer(
        "durationMs",
        0,
        DURATION_MAX_MS,
        "Gesture duration in milliseconds",
    )
    .with_default(ParamDefault::Int(default_ms))
}

fn namespace() -> ParamSpec {
    ParamSpec::choice(
        "namespace",
        SETTINGS_NAMESPACES,
        "Settings table (system|secure|global)",
    )
    .with_default(ParamDefault::Choice("system"))
}

fn setting_key() -> ParamSpec {
    ParamSpec::token("key", 128, "Settings key, e.g. screen_off_timeout")
}

fn swipe_argv(a: &ValidatedArgs, from: (&str, &str), to: (&str, &str)) -> Vec<String> {
    let mut argv = shell(&["input", "swipe"]);
    for name in [from.0, from.1, to.0, to.1] {
        argv.push(a.int(name).to_string());
    }
    argv.push(a.int("durationMs").to_string());
    argv
}

pub(super) fn builtin_commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("list_devices", "List devices known to the bridge")
            .invocation(|_| vec!["devices".into(), "-l".into()])
            .summary(|_| "Device list retrieved".into()),
        CommandSpec::new("wifi_control", "Turn WiFi on or off")
            .param(ParamSpec::choice("state", ON_OFF, "Desired WiFi state"))
            .device_targeted()
            .invocation(|a| shell(&["svc", "wifi", enable_word(a.text("state"))]))
            .summary(|a| format!("WiFi {}", enabled_word(a.text("state")))),
        CommandSpec::new("bluetooth_control", "Turn Bluetooth on or off")
            .param(ParamSpec::choice("state", ON_OFF, "Desired Bluetooth state"))
            .device_targeted()
            .invocation(|a| shell(&["svc", "bluetooth", enable_word(a.text("state"))]))
            .summary(|a| format!("Bluetooth {}", enabled_word(a.text("state")))),
        CommandSpec::new(
            "torch_control",
            "Switch the camera flashlight on or off (writes the LED node, via su if needed)",
        )
        .param(ParamSpec::choice("state", ON_OFF, "Desired torch state"))
        .device_targeted()
        .invocation(|a| {
            let level = if a.text("state") == "on" { "1" } else { "0" };
            let write = format!("echo {level} > {TORCH_NODE}");
            // unprivileged write first, then root; still one bridge invocation
            vec![
                "shell".into(),
                format!("{write} 2>/dev/null || su -c {}", remote_quote(&write)),
            ]
        })
        .summary(|a| format!("Torch {}", enabled_word(a.text("state")))),
        CommandSpec::new("volume_control", "Raise, lower or mute the media volume")
            .param(ParamSpec::choice("action", VOLUME_ACTIONS, "Volume action"))
            .device_targeted()
            .invocation(|a| shell(&["input", "keyevent", volume_keycode(a.text("action"))]))
            .summary(|a| format!("Volume {}", a.text("action"))),
        CommandSpec::new("music_control", "Send a media key to the active player")
            .param(ParamSpec::choice("action", MUSIC_ACTIONS, "Media key"))
            .device_targeted()
            .invocation(|a| shell(&["input", "keyevent", music_keycode(a.text("action"))]))
            .summary(|a| format!("Media key '{}' sent", a.text("action"))),
        CommandSpec::new("tap", "Tap at screen coordinates")
            .param(coord("x", "X coordinate in pixels"))
            .param(coord("y", "Y coordinate in pixels"))
            .device_targeted()
            .invocation(|a| {
                let mut argv = shell(&["input", "tap"]);
                argv.push(a.int("x").to_string());
                argv.push(a.int("y").to_string());
                argv
            })
            .summary(|a| format!("Tapped at ({}, {})", a.int("x"), a.int("y"))),
        CommandSpec::new("long_press", "Press and hold at screen coordinates")
            .param(coord("x", "X coordinate in pixels"))
            .param(coord("y", "Y coordinate in pixels"))
            .param(duration(1000))
            .device_targeted()
            .invocation(|a| swipe_argv(a, ("x", "y"), ("x", "y")))
            .summary(|a| {
                format!(
                    "Long pressed at ({}, {}) for {}ms",
                    a.int("x"),
                    a.int("y"),
                    a.int("durationMs")
                )
            }),
        CommandSpec::new("swipe", "Swipe between two points")
            .param(coord("startX", "Start X coordinate"))
            .param(coord("startY", "Start Y coordinate"))
            .param(coord("endX", "End X coordinate"))
            .param(coord("endY", "End Y coordinate"))
            .param(duration(300))
            .device_targeted()
            .invocation(|a| swipe_argv(a, ("startX", "startY"), ("endX", "endY")))
            .summary(|a| {
                format!(
                    "Swiped from ({}, {}) to ({}, {}) in {}ms",
                    a.int("startX"),
                    a.int("startY"),
                    a.int("endX"),
                    a.int("endY"),
                    a.int("durationMs")
                )
            }),
        CommandSpec::new("type_text", "Type text into the focused input field")
            .param(
                ParamSpec::text("text", TEXT_MAX_LEN, "Text to type (must not contain '%s')")
                    .with_format(TextFormat::InputText)
                    .sensitive(),
            )
            .device_targeted()
            .invocation(|a| {
                // `input text` treats %s as a space
                let encoded = a.text("text").replace(' ', "%s");
                let mut argv = shell(&["input", "text"]);
                argv.push(remote_quote(&encoded));
                argv
            })
            .summary(|a| format!("Typed {} characters", a.text("text").chars().count())),
        CommandSpec::new("get_setting", "Read an Android settings value")
            .param(namespace())
            .param(setting_key())
            .device_targeted()
            .invocation(|a| shell(&["settings", "get", a.text("namespace"), a.text("key")]))
            .summary(|a| format!("Read {}/{}", a.text("namespace"), a.text("key"))),
        CommandSpec::new("set_setting", "Write an Android settings value")
            .param(namespace())
            .param(setting_key())
            .param(ParamSpec::text("value", TEXT_MAX_LEN, "New value").sensitive())
            .device_targeted()
            .invocation(|a| {
                let mut argv = shell(&["settings", "put", a.text("namespace"), a.text("key")]);
                argv.push(remote_quote(a.text("value")));
                argv
            })
            .summary(|a| format!("Set {}/{}", a.text("namespace"), a.text("key"))),
        CommandSpec::new("set_brightness", "Set screen brightness as a percentage")
            .param(ParamSpec::integer("percent", 0, 100, "Brightness percentage"))
            .device_targeted()
            .invocation(|a| {
                let level = (a.int("percent") * 255 + 50) / 100;
                let mut argv = shell(&["settings", "put", "system", "screen_brightness"]);
                argv.push(level.to_string());
                argv
            })
            .summary(|a| format!("Brightness set to {}%", a.int("percent"))),
        CommandSpec::new("sensor_read", "Dump the sensor service state")
            .device_targeted()
            .invocation(|_| shell(&["dumpsys", "sensorservice"]))
            .summary(|_| "Sensor service state retrieved".into()),
    ]
}
