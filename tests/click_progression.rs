mod common;

use mineclick::game::{GameError, GameRules, QuestPeriod};

#[test]
fn clicks_accumulate_and_exp_stays_below_threshold() {
    let (_dir, game) = common::game();
    let exp_per_level = game.rules().exp_per_level;
    let mut last_gold_earned = 0;
    for n in 1..=150u64 {
        let outcome = game.resolve_click(1).expect("click");
        assert_eq!(outcome.totals.total_clicks, n);
        assert!(outcome.totals.exp < exp_per_level, "exp {} after click {}", outcome.totals.exp, n);
        assert!(outcome.gold >= 1);
        assert!(outcome.totals.total_gold_earned >= last_gold_earned + outcome.gold);
        last_gold_earned = outcome.totals.total_gold_earned;
    }
    let player = game.store().get_player(1).expect("player");
    assert_eq!(player.total_clicks, 150);
    assert!(player.level > 1);
    assert!(player.exp < exp_per_level);
}

#[test]
fn inventory_never_exceeds_the_cap() {
    let rules = GameRules {
        max_resource_amount: 12,
        ..GameRules::default()
    };
    let (_dir, game) = common::game_with(common::test_catalog(), rules, 3);
    for _ in 0..120 {
        let outcome = game.resolve_click(8).expect("click");
        assert!(outcome.stored <= outcome.amount);
    }
    for resource in &game.catalog().resources {
        assert!(common::inventory(&game, 8, &resource.id) <= 12);
    }
    // 120 clicks in the coal mine drop far more than 12 coal
    assert_eq!(common::inventory(&game, 8, "coal"), 12);
}

#[test]
fn clicks_feed_the_daily_clicks_quest() {
    let (_dir, game) = common::game_with(common::single_quest_catalog(3), GameRules::default(), 11);
    game.resolve_click(4).expect("click 1");
    game.resolve_click(4).expect("click 2");
    let third = game.resolve_click(4).expect("click 3");
    assert_eq!(third.completed_quests.len(), 1);
    assert_eq!(third.completed_quests[0].name, "Clicks Warmup");

    let fourth = game.resolve_click(4).expect("click 4");
    assert!(fourth.completed_quests.is_empty());

    let quests = game.list_quests(4, QuestPeriod::Daily).expect("quests");
    assert_eq!(quests.len(), 1);
    assert!(quests[0].completed);
    assert_eq!(game.store().get_player(4).unwrap().daily_quests_completed, 1);
}

#[test]
fn travel_is_gated_by_level() {
    let (_dir, game) = common::game();
    game.register_player(2, None).expect("register");
    let err = game.travel(2, "diamond_cave").unwrap_err();
    assert!(matches!(err, GameError::LevelTooLow { required: 10, current: 1 }));
    assert_eq!(game.store().get_player(2).unwrap().current_location, "coal_mine");
    assert!(matches!(game.travel(2, "moon_base"), Err(GameError::NotFound(_))));
}
