mod common;

use mineclick::game::{achievement_registry, GameError};

#[test]
fn repeated_evaluation_never_pays_twice() {
    let (_dir, game) = common::game();
    let click = game.resolve_click(1).expect("click");
    assert!(click.achievements.iter().any(|a| a.id == "first_click"));
    let gold = game.store().get_player(1).unwrap().gold;

    assert!(game.evaluate_achievements(1).expect("first").is_empty());
    assert!(game.evaluate_achievements(1).expect("second").is_empty());
    assert_eq!(game.store().get_player(1).unwrap().gold, gold);
}

#[test]
fn stocked_inventory_unlocks_collector_once() {
    let (_dir, game) = common::game();
    common::stock(&game, 2, &[("coal", 40), ("iron", 15)]);
    let unlocked = game.evaluate_achievements(2).expect("evaluate");
    let ids: Vec<_> = unlocked.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["resources_50"]);
    let player = game.store().get_player(2).unwrap();
    assert_eq!(player.gold, 70);
    assert_eq!(player.exp, 35);
    assert!(game.evaluate_achievements(2).expect("again").is_empty());
}

#[test]
fn view_lists_every_achievement_with_progress() {
    let (_dir, game) = common::game();
    for _ in 0..5 {
        game.resolve_click(3).expect("click");
    }
    let view = game.achievements_view(3).expect("view");
    assert_eq!(view.len(), achievement_registry().len());
    let first = view.iter().find(|a| a.id == "first_click").unwrap();
    assert!(first.unlocked);
    assert_eq!(first.percent(), 100);
    let clicks = view.iter().find(|a| a.id == "clicks_100").unwrap();
    assert!(!clicks.unlocked);
    assert_eq!((clicks.progress, clicks.target), (5, 100));
    assert_eq!(clicks.percent(), 5);
}

#[test]
fn unknown_player_sees_everything_locked() {
    let (_dir, game) = common::game();
    let view = game.achievements_view(404).expect("view");
    assert_eq!(view.len(), achievement_registry().len());
    assert!(view.iter().all(|a| !a.unlocked));
    let clicks = view.iter().find(|a| a.id == "clicks_100").unwrap();
    assert_eq!((clicks.progress, clicks.target), (0, 100));

    // viewing does not create the player
    assert!(matches!(game.store().get_player(404), Err(GameError::NotFound(_))));
}
