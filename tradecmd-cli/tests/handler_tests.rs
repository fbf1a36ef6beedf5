//! Integration tests for the command handlers against a mock game server

mod common;

use std::sync::atomic::Ordering;

use common::{Client, FUEL_PRICE, REFUSED_QUANTITY, STARTING_CREDITS, TOKEN};
use tradecmd_core::storage::TOKEN_KEY;
use tradecmd_core::CommandResult;

// ============================================================================
// ACCOUNT
// ============================================================================

#[tokio::test]
async fn test_login_welcomes_user_and_saves_token() {
    let mut client = Client::new().await;

    let (result, lines) = client.run(&format!("LOGIN {TOKEN}")).await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines, vec!["Welcome back, trader.", "For command list see HELP."]);

    let services = client.app.services();
    assert_eq!(services.session.username().as_deref(), Some("trader"));
    assert_eq!(services.store.get(TOKEN_KEY).unwrap().as_deref(), Some(TOKEN));
}

#[tokio::test]
async fn test_login_with_bad_token_fails() {
    let mut client = Client::new().await;

    let (result, lines) = client.run("LOGIN nope").await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(lines, vec!["Incorrect login details. Please try again."]);
    assert!(!client.app.services().session.is_authenticated());
}

#[tokio::test]
async fn test_login_while_signed_in_is_refused() {
    let mut client = Client::signed_in().await;

    let (result, lines) = client.run(&format!("LOGIN {TOKEN}")).await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(lines, vec!["You must be signed out to use this command."]);
}

#[tokio::test]
async fn test_logout_unloads_everything() {
    let mut client = Client::signed_in().await;
    client.run("AUTO new Loop").await;

    let (result, lines) = client.run("LOGOUT").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines, vec!["Goodbye."]);

    let services = client.app.services();
    assert!(!services.session.is_authenticated());
    assert!(!services.client.is_authenticated());
    assert_eq!(services.store.get(TOKEN_KEY).unwrap(), None);
    assert!(services.fleet.ships().await.is_empty());
    assert!(services.scheduler.routes().await.is_none());
}

#[tokio::test]
async fn test_token_prints_current_token() {
    let mut client = Client::signed_in().await;

    let (result, lines) = client.run("token").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines, vec![format!("Token for trader: {TOKEN}")]);

    let (result, lines) = client.run("TOKEN now").await;
    assert_eq!(result, CommandResult::Invalid);
    assert_eq!(lines, vec!["Invalid arguments. (See TOKEN help)"]);

    let (result, lines) = client.run("HELP token").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines[1], "Usage: TOKEN");
}

#[tokio::test]
async fn test_token_needs_a_session() {
    let mut client = Client::new().await;

    let (result, lines) = client.run("TOKEN").await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(lines, vec!["You must be signed in to use this command."]);
}

#[tokio::test]
async fn test_commands_need_a_session() {
    let mut client = Client::new().await;

    let (result, lines) = client.run("SHIPS").await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(lines, vec!["You must be signed in to use this command."]);
}

// ============================================================================
// HELP
// ============================================================================

#[tokio::test]
async fn test_help_signed_out() {
    let mut client = Client::new().await;

    let (result, lines) = client.run("help").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines[0], "Commands available");
    assert!(lines.iter().any(|l| l.starts_with("LOGIN:")));
    assert!(!lines.iter().any(|l| l.starts_with("AUTO:")));

    let (result, lines) = client.run("HELP AUTO").await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(lines, vec!["You must be signed in to use this command."]);

    let (result, lines) = client.run("HELP login").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines[1], "Usage: LOGIN <Token>");
}

#[tokio::test]
async fn test_help_for_commands() {
    let mut client = Client::signed_in().await;

    let (result, lines) = client.run("HELP").await;
    assert_eq!(result, CommandResult::Success);
    assert!(lines.iter().any(|l| l.starts_with("AUTO:")));

    let (result, lines) = client.run("HELP auto").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines[0], "AUTO: Provides functions for automatic routes.");

    let (result, lines) = client.run("HELP warpdrive").await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(lines, vec!["Unknown command: WARPDRIVE"]);
}

// ============================================================================
// SHIPS AND SHIP
// ============================================================================

#[tokio::test]
async fn test_ships_lists_fleet() {
    let mut client = Client::signed_in().await;

    let (result, lines) = client.run("SHIPS").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "Displaying ships.");
    assert!(lines[1].starts_with("1: "));
    assert!(lines[1].ends_with(" - docked at OE-PM"));
    assert!(lines[2].starts_with("2: "));
    assert!(lines[2].contains("flying OE-PM to OE-CR"));
}

#[tokio::test]
async fn test_ships_refresh() {
    let mut client = Client::new().await;
    assert!(client.app.execute(&format!("LOGIN {TOKEN}")).await.is_success());
    client.output.drain();

    let (result, lines) = client.run("SHIPS refresh").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines[0], "Ship data refreshed.");
    assert_eq!(client.app.services().fleet.ships().await.len(), 2);
}

#[tokio::test]
async fn test_fly_starts_transit() {
    let mut client = Client::signed_in().await;

    let (result, lines) = client.run("SHIP 1 fly oe-cr").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines, vec!["Flight started successfully. Destination: OE-CR."]);

    let ship = client.app.services().fleet.find("1").await.unwrap();
    assert!(ship.in_transit());
    assert_eq!(ship.transit.unwrap().destination, "OE-CR");

    let (result, lines) = client.run("SHIP 1 fly OE-NY").await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(lines, vec!["Ship is already in transit on an existing flight plan."]);
}

#[tokio::test]
async fn test_fly_to_current_location_succeeds() {
    let mut client = Client::signed_in().await;

    let (result, lines) = client.run("SHIP 1 fly OE-PM").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines, vec!["Ship is already docked in specified location."]);
}

#[tokio::test]
async fn test_fly_to_unknown_destination() {
    let mut client = Client::signed_in().await;

    let (result, lines) = client.run("SHIP 1 fly NOWHERE").await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(
        lines,
        vec!["Destination does not exist. Please check destination and try again."]
    );
}

#[tokio::test]
async fn test_warp_reports_server_message() {
    let mut client = Client::signed_in().await;

    let (result, lines) = client.run("SHIP 1 warp").await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(lines, vec!["Ship is not docked at a wormhole."]);
}

#[tokio::test]
async fn test_unknown_ship() {
    let mut client = Client::signed_in().await;

    let (result, lines) = client.run("SHIP 9 info").await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(
        lines,
        vec!["Invalid ship id. Please use number ids and not the full string id."]
    );
}

#[tokio::test]
async fn test_rename_then_info_by_name() {
    let mut client = Client::signed_in().await;
    let before = client.app.services().fleet.find("1").await.unwrap();

    let (result, lines) = client.run("SHIP 1 rename Hauler").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines, vec![format!("Ship {} renamed to Hauler.", before.display_name)]);

    let (result, lines) = client.run("SHIP hauler info").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines[0], "Displaying info for Hauler.");
    assert!(lines.contains(&"Server Id: ship-a".to_string()));
    assert!(lines.contains(&"Type: JW-MK-I".to_string()));
    assert!(lines.contains(&"Cargo Capacity: 50".to_string()));
}

#[tokio::test]
async fn test_malformed_ship_command_hints_help() {
    let mut client = Client::signed_in().await;

    let (result, lines) = client.run("SHIP 1 teleport").await;
    assert_eq!(result, CommandResult::Invalid);
    assert_eq!(lines, vec!["Invalid arguments. (See SHIP help)"]);
}

// ============================================================================
// MARKET
// ============================================================================

#[tokio::test]
async fn test_market_list_by_ship_and_symbol() {
    let mut client = Client::signed_in().await;

    let (result, lines) = client.run("MARKET list 1").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines[0], "Displaying market data for OE-PM.");
    assert!(lines.iter().any(|l| l.starts_with("FUEL")));

    let (result, lines) = client.run("MARKET list xx-yy").await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(lines, vec!["Market data unavailable for XX-YY."]);
}

#[tokio::test]
async fn test_buy_then_sell() {
    let mut client = Client::signed_in().await;

    let (result, lines) = client.run("MARKET 1 buy fuel 10").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(
        lines,
        vec![format!(
            "10 units of cargo purchased successfully. Total cost: {} credits.",
            10 * FUEL_PRICE
        )]
    );

    let services = client.app.services();
    let credits = STARTING_CREDITS - 10 * FUEL_PRICE;
    assert_eq!(services.session.account().unwrap().credits, credits);
    let ship = services.fleet.find("1").await.unwrap();
    assert_eq!(ship.status.unwrap().cargo[0].quantity, 30);

    let (result, lines) = client.run("MARKET 1 sell FUEL max").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(
        lines,
        vec![
            "Selling maximum. Sell quantity: 30.",
            "30 units of cargo sold successfully. Total made: 30 credits.",
        ]
    );
    assert_eq!(
        client.app.services().session.account().unwrap().credits,
        credits + 30
    );
}

#[tokio::test]
async fn test_buy_beyond_hold_space_buys_what_fits() {
    let mut client = Client::signed_in().await;

    let (result, lines) = client.run("MARKET 1 buy FUEL 100").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(
        lines[0],
        "Insufficient cargo space available for purchase. Purchasing maximum."
    );
    assert!(lines[1].starts_with("30 units of cargo purchased successfully."));
}

#[tokio::test]
async fn test_trade_failures() {
    let mut client = Client::signed_in().await;

    let (result, lines) = client.run("MARKET 1 sell METALS 5").await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(lines, vec!["The good specified could not be found in the ships cargo."]);

    let (result, lines) = client.run("MARKET 1 buy METALS 5").await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(lines, vec!["The good specified is not in stock at this ships market."]);

    let (result, lines) = client.run("MARKET 1 buy FUEL lots").await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(lines, vec!["Invalid quantity provided. Must be at least 1."]);

    let (result, lines) = client.run("MARKET 2 buy FUEL 1").await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(lines, vec!["Ship is not currently docked."]);

    let (result, lines) = client.run("MARKET 1 buy FUEL").await;
    assert_eq!(result, CommandResult::Invalid);
    assert_eq!(lines, vec!["Invalid arguments. (See MARKET help)"]);
}

#[tokio::test]
async fn test_refused_purchase_resyncs_credits() {
    let mut client = Client::signed_in().await;
    // Credits spent elsewhere since sign-in
    client.mock.credits.store(700, Ordering::SeqCst);

    let (result, lines) = client.run(&format!("MARKET 1 buy FUEL {REFUSED_QUANTITY}")).await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(lines, vec!["Purchase could not be completed."]);
    assert_eq!(client.app.services().session.account().unwrap().credits, 700);
}
