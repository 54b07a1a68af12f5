//! Match loop driven step by step, observed through the client view

use tokio::sync::broadcast;
use uuid::Uuid;

use arena_server::client::{ClientView, ObserverEvent, ObserverQueue};
use arena_server::config::SimConfig;
use arena_server::game::components::NetworkId;
use arena_server::game::{Addressed, GameMatch, SimInput};
use arena_server::ws::handler::to_sim_input;
use arena_server::ws::protocol::{ClientMsg, ServerMsg};

fn config() -> SimConfig {
    let mut config = SimConfig {
        tick_rate: 10,
        snapshot_rate: 5,
        countdown_seconds: 2,
        player_amount: 2,
        ..SimConfig::default()
    };
    config.slime.cap = 0;
    config.rogue.cap = 0;
    config
}

fn deliver(
    rx: &mut broadcast::Receiver<Addressed>,
    me: NetworkId,
    view: &mut ClientView,
    observer: &mut ObserverQueue,
) -> Vec<ServerMsg> {
    let mut received = Vec::new();
    while let Ok(addressed) = rx.try_recv() {
        if addressed.recipient.includes(me) {
            view.apply(&addressed.msg, observer);
            received.push(addressed.msg);
        }
    }
    received
}

#[test]
fn clients_follow_the_match_into_play() {
    let (mut game_match, handle) = GameMatch::new(Uuid::new_v4(), config(), 9);

    let (a, mut a_rx) = tokio_test::block_on(handle.connect()).unwrap();
    let (b, mut b_rx) = tokio_test::block_on(handle.connect()).unwrap();
    assert_eq!((a, b), (NetworkId(1), NetworkId(2)));

    let mut a_view = ClientView::new(handle.tick_rate);
    let mut a_observer = ObserverQueue::new();
    let mut b_view = ClientView::new(handle.tick_rate);
    let mut b_observer = ObserverQueue::new();
    a_view.apply(
        &ServerMsg::Welcome {
            network_id: a,
            match_id: handle.id,
            tick_rate: handle.tick_rate,
        },
        &mut a_observer,
    );

    let entry = to_sim_input(a, &ClientMsg::RequestGameEntry).unwrap();
    tokio_test::block_on(handle.send(entry)).unwrap();
    assert!(game_match.step());
    deliver(&mut a_rx, a, &mut a_view, &mut a_observer);
    deliver(&mut b_rx, b, &mut b_view, &mut b_observer);
    assert_eq!(
        a_observer.drain(),
        vec![ObserverEvent::PlayersRemainingToStart(1)]
    );
    assert_eq!(
        b_observer.drain(),
        vec![ObserverEvent::PlayersRemainingToStart(1)]
    );

    tokio_test::block_on(handle.send(SimInput::RequestGameEntry(b))).unwrap();
    game_match.step();
    deliver(&mut a_rx, a, &mut a_view, &mut a_observer);
    let start_tick = a_view.start_tick().expect("start tick broadcast");
    assert_eq!(start_tick, game_match.simulation().tick().add(20));

    let mut now = game_match.simulation().tick();
    while !now.is_newer_than(start_tick) {
        game_match.step();
        now = game_match.simulation().tick();
        deliver(&mut a_rx, a, &mut a_view, &mut a_observer);
        a_view.update(now, &mut a_observer);
    }

    let notifications = a_observer.drain();
    assert_eq!(notifications.last(), Some(&ObserverEvent::CountdownEnded));
    assert!(notifications.contains(&ObserverEvent::CountdownSecondsRemaining(2)));
    assert!(notifications.contains(&ObserverEvent::CountdownSecondsRemaining(1)));
    assert!(game_match.simulation().state().is_playing());

    assert_eq!(a_view.own_entities().len(), 1);
    assert_eq!(a_view.entities().len(), 2);
    assert!(a_view.server_tick().is_newer_or_equal(start_tick));
}

#[test]
fn inputs_reach_the_owning_player() {
    let (mut game_match, handle) = GameMatch::new(Uuid::new_v4(), config(), 9);
    let (a, _a_rx) = tokio_test::block_on(handle.connect()).unwrap();
    tokio_test::block_on(handle.send(SimInput::RequestGameEntry(a))).unwrap();
    game_match.step();

    let tick = game_match.simulation().tick().add(1);
    let msg = ClientMsg::decode(&format!(
        r#"{{"type":"input","tick":{},"move_x":1.0,"move_y":0.0,"sprint":false}}"#,
        tick.index()
    ))
    .unwrap();
    tokio_test::block_on(handle.send(to_sim_input(a, &msg).unwrap())).unwrap();
    game_match.step();

    let world = game_match.simulation().world();
    let player = world.players_of(a)[0];
    let input = world.inputs.get(player).unwrap().get_at_or_before(tick).copied();
    assert_eq!(input.map(|i| i.movement.x), Some(1.0));
}

#[test]
fn disconnect_gives_the_lobby_slot_back() {
    let (mut game_match, handle) = GameMatch::new(Uuid::new_v4(), config(), 9);
    let (a, _a_rx) = tokio_test::block_on(handle.connect()).unwrap();
    let (b, mut b_rx) = tokio_test::block_on(handle.connect()).unwrap();
    tokio_test::block_on(handle.send(SimInput::RequestGameEntry(a))).unwrap();
    game_match.step();
    assert_eq!(game_match.simulation().state().players_joined(), 1);

    tokio_test::block_on(handle.disconnect(a)).unwrap();
    game_match.step();
    assert_eq!(game_match.simulation().state().players_joined(), 0);
    assert_eq!(handle.player_count(), 1);
    assert!(handle.is_lobby_open());

    let mut view = ClientView::new(handle.tick_rate);
    let mut observer = ObserverQueue::new();
    deliver(&mut b_rx, b, &mut view, &mut observer);
    assert_eq!(
        observer.drain(),
        vec![
            ObserverEvent::PlayersRemainingToStart(1),
            ObserverEvent::PlayersRemainingToStart(2),
        ]
    );
}
