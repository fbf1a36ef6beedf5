//! Integration tests for AUTO and routes running through real handlers

mod common;

use common::{Client, FUEL_PRICE, STARTING_CREDITS};
use tradecmd_core::{CommandResult, TickOutcome};

async fn tick(client: &mut Client) -> (TickOutcome, Vec<String>) {
    let outcome = client
        .app
        .services()
        .scheduler
        .tick(client.app.dispatcher())
        .await;
    (outcome, client.output.drain())
}

#[tokio::test]
async fn test_route_editing() {
    let mut client = Client::signed_in().await;

    let (result, lines) = client.run("AUTO list").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines, vec!["No routes created. Use AUTO new <Route Name> to create one."]);

    let (_, lines) = client.run("AUTO new \"Fuel loop\"").await;
    assert_eq!(lines, vec!["New route created. Id: 1."]);

    let (_, lines) = client.run("AUTO add 1 SHIP $s info").await;
    assert_eq!(lines, vec!["Command added successfully."]);
    client.run("AUTO add 1 1 SHIPS refresh").await;
    client.run("AUTO add 1 99 MARKET $s sell FUEL max").await;

    let (result, lines) = client.run("AUTO list commands 1").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(
        lines,
        vec![
            "Displaying auto route commands for Fuel loop.",
            "1: SHIPS refresh",
            "2: SHIP $s info",
            "3: MARKET $s sell FUEL max",
        ]
    );

    let (_, lines) = client.run("AUTO remove 1 2").await;
    assert_eq!(lines, vec!["Command deleted successfully."]);

    let (result, lines) = client.run("AUTO remove 1 5").await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(lines, vec!["Invalid command index provided."]);

    let (result, lines) = client.run("AUTO remove 4 x").await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(lines, vec!["Invalid route id provided."]);

    let (_, lines) = client.run("AUTO list").await;
    assert_eq!(
        lines,
        vec!["Displaying auto route list.", "1: Fuel loop - 2 commands, 0 ships"]
    );
}

#[tokio::test]
async fn test_delete_renumbers_routes() {
    let mut client = Client::signed_in().await;
    client.run("AUTO new first").await;
    client.run("AUTO new second").await;

    let (result, lines) = client.run("AUTO delete 1").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines, vec!["Auto route deleted."]);

    let (_, lines) = client.run("AUTO list").await;
    assert_eq!(lines[1], "1: second - 0 commands, 0 ships");

    let (result, lines) = client.run("AUTO delete 2").await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(lines, vec!["Invalid route id provided."]);
}

#[tokio::test]
async fn test_start_and_stop_ships() {
    let mut client = Client::signed_in().await;
    client.run("AUTO new Loop").await;
    client.run("AUTO new Other").await;

    let (result, lines) = client.run("AUTO start 1 1").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines, vec!["Ship added to route."]);

    let (result, lines) = client.run("AUTO start 1 1").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines, vec!["Ship provided is already on route."]);

    let (result, lines) = client.run("AUTO start 2 1").await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(
        lines,
        vec!["Ship is already on another route. Please remove ship from current route before adding it to a new one."]
    );

    let (result, lines) = client.run("AUTO start 1 99").await;
    assert_eq!(result, CommandResult::Failure);
    assert_eq!(
        lines,
        vec!["Invalid ship id. Please use number ids and not the full string id."]
    );

    let ship = client.app.services().fleet.find("1").await.unwrap();
    let (_, lines) = client.run("AUTO list ships 1").await;
    assert_eq!(
        lines,
        vec![
            "Displaying auto route ships for Loop.".to_string(),
            format!("1: {}", ship.display_name),
        ]
    );

    let (result, lines) = client.run("AUTO stop 1 1").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines, vec!["Ship removed from route."]);

    let (result, lines) = client.run("AUTO stop 1 1").await;
    assert_eq!(result, CommandResult::Success);
    assert_eq!(lines, vec!["Ship provided is not currently on this route."]);
}

#[tokio::test]
async fn test_route_runs_commands_for_ship() {
    let mut client = Client::signed_in().await;
    client.run("AUTO new Loop").await;
    client.run("AUTO add 1 SHIP $s info").await;
    client.run("AUTO start 1 1").await;

    let (outcome, lines) = tick(&mut client).await;
    assert_eq!(outcome, TickOutcome::Completed { executed: 1, evicted: 0 });
    assert!(lines[0].starts_with("Displaying info for "));
    assert!(lines.contains(&"Server Id: ship-a".to_string()));
}

#[tokio::test]
async fn test_background_trade_is_quiet() {
    let mut client = Client::signed_in().await;
    client.run("AUTO new Loop").await;
    client.run("AUTO add 1 MARKET $s buy FUEL 5").await;
    client.run("AUTO start 1 1").await;

    let (outcome, lines) = tick(&mut client).await;
    assert_eq!(outcome, TickOutcome::Completed { executed: 1, evicted: 0 });
    assert!(lines.is_empty());
    assert_eq!(
        client.app.services().session.account().unwrap().credits,
        STARTING_CREDITS - 5 * FUEL_PRICE
    );
}

#[tokio::test]
async fn test_background_out_of_stock_keeps_ship_on_route() {
    let mut client = Client::signed_in().await;
    client.run("AUTO new Loop").await;
    client.run("AUTO add 1 MARKET $s buy METALS 5").await;
    client.run("AUTO start 1 1").await;

    let (outcome, lines) = tick(&mut client).await;
    assert_eq!(outcome, TickOutcome::Completed { executed: 1, evicted: 0 });
    assert_eq!(lines, vec!["Market in route is out of stock. Attempting to continue."]);
}

#[tokio::test]
async fn test_foreground_only_command_evicts_ship() {
    let mut client = Client::signed_in().await;
    client.run("AUTO new Loop").await;
    client.run("AUTO add 1 AUTO list").await;
    client.run("AUTO start 1 1").await;
    let ship = client.app.services().fleet.find("1").await.unwrap();

    let (outcome, lines) = tick(&mut client).await;
    assert_eq!(outcome, TickOutcome::Completed { executed: 1, evicted: 1 });
    assert_eq!(
        lines,
        vec![
            "This command cannot be run automatically.".to_string(),
            format!(
                "Command failed for {} during route. Ship removed from route.",
                ship.display_name
            ),
            "Command failed: AUTO list".to_string(),
        ]
    );

    let route = client.app.services().scheduler.route(1).await.unwrap();
    assert!(route.ships.is_empty());
}

#[tokio::test]
async fn test_travelling_ship_waits() {
    let mut client = Client::signed_in().await;
    client.run("AUTO new Loop").await;
    client.run("AUTO add 1 SHIP $s info").await;
    client.run("AUTO start 1 2").await;

    let (outcome, lines) = tick(&mut client).await;
    assert_eq!(outcome, TickOutcome::Completed { executed: 0, evicted: 0 });
    assert!(lines.is_empty());
}
