use clap::CommandFactory;

use super::*;

#[test]
fn command_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn create_parses_dates_and_leave_type() {
    let cli = Cli::try_parse_from([
        "leavectl",
        "--as",
        "7",
        "create",
        "2024-04-08",
        "2024-04-10",
        "paid_leave",
        "family visit",
    ])
    .expect("parse");

    assert_eq!(cli.user_id, 7);
    let Command::Create {
        start, leave_type, ..
    } = cli.command
    else {
        panic!("expected create");
    };
    assert_eq!(start, NaiveDate::from_ymd_opt(2024, 4, 8).expect("date"));
    assert_eq!(leave_type, LeaveType::PaidLeave);
}

#[test]
fn unknown_role_is_rejected() {
    assert!(Cli::try_parse_from(["leavectl", "--role", "boss", "show", "1"]).is_err());
}

#[test]
fn page_offset_rejects_pages_past_the_addressable_range() {
    assert_eq!(page_offset(1, 20).expect("first page"), 0);
    assert_eq!(page_offset(3, 20).expect("third page"), 40);
    assert_eq!(page_offset(0, 20).expect("page zero"), 0);
    assert!(page_offset(u32::MAX, 20).is_err());
}

#[test]
fn stats_takes_either_a_user_or_a_department() {
    let cli = Cli::try_parse_from(["leavectl", "stats", "--department", "Support"])
        .expect("parse");
    let Command::Stats { department, .. } = cli.command else {
        panic!("expected stats");
    };
    assert_eq!(department.as_deref(), Some("Support"));

    assert!(
        Cli::try_parse_from(["leavectl", "stats", "--user", "3", "--department", "Support"])
            .is_err()
    );
}
