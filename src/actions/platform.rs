// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Per-OS launcher command lines

use std::path::Path;

/// Program plus arguments
pub type Invocation = (String, Vec<String>);

/// Characters `cmd.exe` acts on even inside a `start` argument
const CMD_METACHARACTERS: &[char] = &['&', '|', '<', '>', '^', '%', '"', '\n', '\r'];

fn invocation(program: &str, args: &[&str]) -> Invocation {
    (
        program.to_string(),
        args.iter().map(|a| a.to_string()).collect(),
    )
}

/// Open a URL or file with the default handler
pub fn open_target(target: &str) -> Invocation {
    if cfg!(target_os = "windows") {
        // explorer takes the target verbatim, so query strings keep their `&`
        invocation("explorer", &[target])
    } else if cfg!(target_os = "macos") {
        invocation("open", &[target])
    } else {
        invocation("xdg-open", &[target])
    }
}

/// Refuse application names that `cmd /C start` would split or expand.
/// Applied on every OS so a name behaves the same everywhere.
pub fn check_app_name(name: &str) -> Result<(), String> {
    match name.chars().find(|c| CMD_METACHARACTERS.contains(c)) {
        Some(c) => Err(format!(
            "Application name '{}' contains unsupported character {:?}",
            name.escape_debug(),
            c
        )),
        None => Ok(()),
    }
}

/// Launch an application by name. Callers vet `name` with [`check_app_name`].
pub fn open_app(name: &str) -> Invocation {
    if cfg!(target_os = "windows") {
        invocation("cmd", &["/C", "start", "", name])
    } else if cfg!(target_os = "macos") {
        invocation("open", &["-a", name])
    } else {
        invocation(name, &[])
    }
}

/// Type text into the focused window
pub fn type_text(text: &str) -> Invocation {
    if cfg!(target_os = "windows") {
        let script = format!(
            "Add-Type -AssemblyName System.Windows.Forms; [System.Windows.Forms.SendKeys]::SendWait('{}')",
            escape_send_keys(text).replace('\'', "''")
        );
        invocation("powershell", &["-NoProfile", "-Command", &script])
    } else if cfg!(target_os = "macos") {
        let script = format!(
            "tell application \"System Events\" to keystroke \"{}\"",
            text.replace('\\', "\\\\").replace('"', "\\\"")
        );
        invocation("osascript", &["-e", &script])
    } else {
        invocation("xdotool", &["type", "--", text])
    }
}

/// Press a single key or chord such as `enter` or `ctrl+c`
pub fn press_key(key: &str) -> Invocation {
    if cfg!(target_os = "windows") {
        let script = format!(
            "Add-Type -AssemblyName System.Windows.Forms; [System.Windows.Forms.SendKeys]::SendWait('{}')",
            send_keys_chord(key).replace('\'', "''")
        );
        invocation("powershell", &["-NoProfile", "-Command", &script])
    } else if cfg!(target_os = "macos") {
        let script = format!(
            "tell application \"System Events\" to key code {}",
            mac_key_code(key)
        );
        invocation("osascript", &["-e", &script])
    } else {
        invocation("xdotool", &["key", &xdotool_chord(key)])
    }
}

/// Capture the screen to `path`
pub fn screenshot(path: &Path) -> Invocation {
    let target = path.to_string_lossy();
    if cfg!(target_os = "windows") {
        let script = format!(
            "Add-Type -AssemblyName System.Windows.Forms,System.Drawing; \
             $b = [System.Windows.Forms.Screen]::PrimaryScreen.Bounds; \
             $bmp = New-Object System.Drawing.Bitmap $b.Width, $b.Height; \
             $g = [System.Drawing.Graphics]::FromImage($bmp); \
             $g.CopyFromScreen($b.Location, [System.Drawing.Point]::Empty, $b.Size); \
             $bmp.Save('{}')",
            target.replace('\'', "''")
        );
        invocation("powershell", &["-NoProfile", "-Command", &script])
    } else if cfg!(target_os = "macos") {
        invocation("screencapture", &["-x", &target])
    } else {
        invocation("gnome-screenshot", &["-f", &target])
    }
}

/// `ctrl+shift+t` -> `ctrl+shift+t` with xdotool key names
fn xdotool_chord(key: &str) -> String {
    key.split('+')
        .map(|part| match part.trim().to_lowercase().as_str() {
            "enter" | "return" => "Return".to_string(),
            "esc" | "escape" => "Escape".to_string(),
            "tab" => "Tab".to_string(),
            "space" => "space".to_string(),
            "backspace" => "BackSpace".to_string(),
            "delete" | "del" => "Delete".to_string(),
            "up" => "Up".to_string(),
            "down" => "Down".to_string(),
            "left" => "Left".to_string(),
            "right" => "Right".to_string(),
            "cmd" | "win" | "super" => "super".to_string(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("+")
}

fn escape_send_keys(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '+' | '^' | '%' | '~' | '(' | ')' | '{' | '}' | '[' | ']' => format!("{{{}}}", c),
            other => other.to_string(),
        })
        .collect()
}

fn send_keys_chord(key: &str) -> String {
    let mut prefix = String::new();
    let mut last = String::new();
    for part in key.split('+').map(|p| p.trim().to_lowercase()) {
        match part.as_str() {
            "ctrl" | "control" => prefix.push('^'),
            "shift" => prefix.push('+'),
            "alt" => prefix.push('%'),
            "enter" | "return" => last = "{ENTER}".to_string(),
            "esc" | "escape" => last = "{ESC}".to_string(),
            "tab" => last = "{TAB}".to_string(),
            "backspace" => last = "{BACKSPACE}".to_string(),
            "delete" | "del" => last = "{DELETE}".to_string(),
            "up" => last = "{UP}".to_string(),
            "down" => last = "{DOWN}".to_string(),
            "left" => last = "{LEFT}".to_string(),
            "right" => last = "{RIGHT}".to_string(),
            other => last = other.to_string(),
        }
    }
    format!("{}{}", prefix, last)
}

fn mac_key_code(key: &str) -> u16 {
    match key.trim().to_lowercase().as_str() {
        "enter" | "return" => 36,
        "tab" => 48,
        "space" => 49,
        "backspace" | "delete" => 51,
        "esc" | "escape" => 53,
        "left" => 123,
        "right" => 124,
        "down" => 125,
        "up" => 126,
        _ => 36,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xdotool_chord() {
        assert_eq!(xdotool_chord("enter"), "Return");
        assert_eq!(xdotool_chord("ctrl+c"), "ctrl+c");
        assert_eq!(xdotool_chord("Ctrl + Shift + Esc"), "ctrl+shift+Escape");
    }

    #[test]
    fn test_send_keys() {
        assert_eq!(send_keys_chord("ctrl+c"), "^c");
        assert_eq!(send_keys_chord("enter"), "{ENTER}");
        assert_eq!(escape_send_keys("1+1"), "1{+}1");
    }

    #[test]
    fn test_check_app_name() {
        assert!(check_app_name("notepad").is_ok());
        assert!(check_app_name("Google Chrome").is_ok());
        assert!(check_app_name("calc & del C:\\x").is_err());
        assert!(check_app_name("a|b").is_err());
        assert!(check_app_name("%COMSPEC%").is_err());
        assert!(check_app_name("x\"y").is_err());
        assert!(check_app_name("line\nbreak").is_err());
    }

    #[cfg(target_os = "windows")]
    #[test]
    fn test_windows_open_target_avoids_cmd() {
        let (program, args) = open_target("https://example.com/?a=1&b=2");
        assert_eq!(program, "explorer");
        assert_eq!(args, vec!["https://example.com/?a=1&b=2"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_linux_invocations() {
        assert_eq!(open_target("https://x.dev").0, "xdg-open");
        assert_eq!(open_app("gedit"), ("gedit".to_string(), vec![]));
        assert_eq!(type_text("hi").1, vec!["type", "--", "hi"]);
        let (program, args) = screenshot(Path::new("/tmp/s.png"));
        assert_eq!(program, "gnome-screenshot");
        assert_eq!(args, vec!["-f", "/tmp/s.png"]);
    }
}
