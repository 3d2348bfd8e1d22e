use clap::{CommandFactory, Parser};
use threadstore::tooling::cli::{Cli, Commands};

#[test]
fn parse_valid_command_matrix() {
    let cases: Vec<Vec<&str>> = vec![
        vec!["threadstore", "thread", "t"],
        vec!["threadstore", "thread", "t", "--format", "json"],
        vec!["threadstore", "show", "1000"],
        vec!["threadstore", "spam", "1000", "2000"],
        vec!["threadstore", "spam", "--unset", "1000"],
        vec!["threadstore", "approve", "1000"],
        vec!["threadstore", "migrate", "t"],
        vec!["threadstore", "threads"],
        vec!["threadstore", "--root", "/tmp/comments", "config", "--format", "json"],
    ];

    for args in cases {
        let parsed = Cli::try_parse_from(args.clone());
        assert!(parsed.is_ok(), "expected valid parse for args: {args:?}");
    }
}

#[test]
fn parse_rejects_missing_arguments() {
    assert!(Cli::try_parse_from(["threadstore", "spam"]).is_err());
    assert!(Cli::try_parse_from(["threadstore", "thread"]).is_err());
    assert!(Cli::try_parse_from(["threadstore", "delete", "1000"]).is_err());
}

#[test]
fn parse_unset_flag() {
    let cli = Cli::try_parse_from(["threadstore", "approve", "--unset", "1000", "2000"]).unwrap();
    match cli.command {
        Commands::Approve { ids, unset } => {
            assert!(unset);
            assert_eq!(ids, vec!["1000", "2000"]);
        }
        _ => panic!("expected approve command"),
    }
}

#[test]
fn command_definition_is_consistent() {
    Cli::command().debug_assert();
}
