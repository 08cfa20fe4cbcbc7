// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use clap::Parser;
use echo_agent::cli::{
    Cli, Commands, ConfigCommands, MemoryCommands, OutputFormat, PluginsCommands,
};

#[test]
fn test_parse_ask_from_stdin() {
    let cli = Cli::try_parse_from(["echo-agent", "ask", "--stdin"]).expect("Valid command parsing");
    match cli.command {
        Some(Commands::Ask(args)) => {
            assert!(args.stdin);
            assert!(args.prompt.is_none());
        }
        other => panic!("Expected Ask command, got {:?}", other),
    }
}

#[test]
fn test_parse_chat_no_stream() {
    let cli = Cli::try_parse_from(["echo-agent", "chat", "--no-stream", "hello there"])
        .expect("Valid command parsing");
    match cli.command {
        Some(Commands::Chat(args)) => {
            assert!(args.no_stream);
            assert_eq!(args.prompt.as_deref(), Some("hello there"));
        }
        other => panic!("Expected Chat command, got {:?}", other),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["echo-agent", "providers", "--format", "json", "-vv"])
        .expect("Valid command parsing");
    assert!(matches!(cli.command, Some(Commands::Providers)));
    assert_eq!(cli.format, OutputFormat::Json);
    assert_eq!(cli.verbose, 2);
}

#[test]
fn test_plugins_disable_and_commands() {
    let cli = Cli::try_parse_from(["echo-agent", "plugins", "disable", "example-plugin"])
        .expect("Valid command parsing");
    match cli.command {
        Some(Commands::Plugins(args)) => match args.command {
            PluginsCommands::Disable { name } => assert_eq!(name, "example-plugin"),
            other => panic!("Expected Disable, got {:?}", other),
        },
        other => panic!("Expected Plugins command, got {:?}", other),
    }

    let cli = Cli::try_parse_from(["echo-agent", "plugin", "commands"]).expect("Valid command parsing");
    assert!(matches!(
        cli.command,
        Some(Commands::Plugins(ref args)) if matches!(args.command, PluginsCommands::Commands)
    ));
}

#[test]
fn test_plugins_run_json_argument() {
    let cli = Cli::try_parse_from([
        "echo-agent",
        "plugins",
        "run",
        "get_forecast",
        r#"{"city":"Paris"}"#,
    ])
    .expect("Valid command parsing");
    match cli.command {
        Some(Commands::Plugins(args)) => match args.command {
            PluginsCommands::Run { command, args } => {
                assert_eq!(command, "get_forecast");
                assert_eq!(args, vec![r#"{"city":"Paris"}"#.to_string()]);
            }
            other => panic!("Expected Run, got {:?}", other),
        },
        other => panic!("Expected Plugins command, got {:?}", other),
    }
}

#[test]
fn test_plugins_requires_subcommand() {
    assert!(Cli::try_parse_from(["echo-agent", "plugins"]).is_err());
}

#[test]
fn test_memory_subcommands() {
    let cli = Cli::try_parse_from(["echo-agent", "memory", "search", "notepad"])
        .expect("Valid command parsing");
    match cli.command {
        Some(Commands::Memory(args)) => match args.command {
            MemoryCommands::Search { query } => assert_eq!(query, "notepad"),
            other => panic!("Expected Search, got {:?}", other),
        },
        other => panic!("Expected Memory command, got {:?}", other),
    }

    let cli = Cli::try_parse_from(["echo-agent", "memory", "clear", "-f"])
        .expect("Valid command parsing");
    match cli.command {
        Some(Commands::Memory(args)) => {
            assert!(matches!(args.command, MemoryCommands::Clear { force: true }))
        }
        other => panic!("Expected Memory command, got {:?}", other),
    }

    let cli = Cli::try_parse_from(["echo-agent", "memory", "facts"]).expect("Valid command parsing");
    assert!(matches!(
        cli.command,
        Some(Commands::Memory(ref args)) if matches!(args.command, MemoryCommands::Facts)
    ));
}

#[test]
fn test_settings_alias_and_show_alias() {
    let cli = Cli::try_parse_from(["echo-agent", "settings", "show"]).expect("Valid command parsing");
    match cli.command {
        Some(Commands::Config(args)) => assert!(matches!(args.command, Some(ConfigCommands::List))),
        other => panic!("Expected Config command, got {:?}", other),
    }
}

#[test]
fn test_config_get_and_path() {
    let cli = Cli::try_parse_from(["echo-agent", "config", "get", "apiKeys.openai"])
        .expect("Valid command parsing");
    match cli.command {
        Some(Commands::Config(args)) => match args.command {
            Some(ConfigCommands::Get { key }) => assert_eq!(key, "apiKeys.openai"),
            other => panic!("Expected Get, got {:?}", other),
        },
        other => panic!("Expected Config command, got {:?}", other),
    }

    let cli = Cli::try_parse_from(["echo-agent", "config", "path"]).expect("Valid command parsing");
    assert!(matches!(
        cli.command,
        Some(Commands::Config(ref args)) if matches!(args.command, Some(ConfigCommands::Path))
    ));
}

#[test]
fn test_config_set_requires_value() {
    assert!(Cli::try_parse_from(["echo-agent", "config", "set", "aiProvider"]).is_err());
}

#[test]
fn test_invalid_format_rejected() {
    assert!(Cli::try_parse_from(["echo-agent", "--format", "yaml"]).is_err());
}

#[test]
fn test_unknown_subcommand_rejected() {
    assert!(Cli::try_parse_from(["echo-agent", "teleport"]).is_err());
}
