mod common;

use chrono::Duration;
use mineclick::game::{quest_tags, GameRules, QuestPeriod};

#[test]
fn new_day_resamples_with_zero_progress() {
    let (_dir, game) = common::game_with(common::single_quest_catalog(10), GameRules::default(), 5);
    game.apply_quest_progress(1, QuestPeriod::Daily, quest_tags::CLICKS, 4)
        .expect("progress");
    let today = game.list_quests(1, QuestPeriod::Daily).expect("today");
    assert_eq!(today.len(), 1);
    assert_eq!(today[0].progress, 4);

    game.clock().advance(Duration::days(1));
    let tomorrow = game.list_quests(1, QuestPeriod::Daily).expect("tomorrow");
    assert_eq!(tomorrow.len(), 1);
    assert_eq!(tomorrow[0].progress, 0);
    assert!(!tomorrow[0].completed);

    let player = game.store().get_player(1).expect("player");
    let expected = QuestPeriod::Daily.key_for(common::start_time() + Duration::days(1));
    assert_eq!(player.last_daily_key.as_deref(), Some(expected.as_str()));
}

#[test]
fn goal_pays_exactly_once() {
    let (_dir, game) = common::game_with(common::single_quest_catalog(5), GameRules::default(), 6);
    let first = game
        .apply_quest_progress(2, QuestPeriod::Daily, quest_tags::CLICKS, 3)
        .expect("first");
    assert!(first.is_empty());

    let done = game
        .apply_quest_progress(2, QuestPeriod::Daily, quest_tags::CLICKS, 7)
        .expect("done");
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].reward_gold, 40);
    let gold_after = game.store().get_player(2).unwrap().gold;
    assert_eq!(gold_after, 40);

    let again = game
        .apply_quest_progress(2, QuestPeriod::Daily, quest_tags::CLICKS, 50)
        .expect("again");
    assert!(again.is_empty());
    let player = game.store().get_player(2).unwrap();
    assert_eq!(player.gold, gold_after);
    assert_eq!(player.daily_quests_completed, 1);
}

#[test]
fn other_tags_leave_the_quest_alone() {
    let (_dir, game) = common::game_with(common::single_quest_catalog(5), GameRules::default(), 7);
    game.apply_quest_progress(3, QuestPeriod::Daily, quest_tags::MARKET, 100)
        .expect("market");
    game.apply_quest_progress(3, QuestPeriod::Daily, quest_tags::CLICKS, 0)
        .expect("zero");
    let quests = game.list_quests(3, QuestPeriod::Daily).expect("quests");
    assert_eq!(quests[0].progress, 0);
}

#[test]
fn standard_sets_sample_distinct_templates() {
    let (_dir, game) = common::game();
    for period in QuestPeriod::ALL {
        let quests = game.list_quests(4, period).expect("quests");
        assert_eq!(quests.len(), game.rules().quest_count(period));
        let mut names: Vec<_> = quests.iter().map(|q| q.name.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), quests.len());
        for quest in &quests {
            assert!(quest.goal >= 1);
            assert!(quest.description.contains(&quest.goal.to_string()));
        }
    }
}

#[test]
fn fiftieth_click_completes_a_fifty_click_quest() {
    let (_dir, game) = common::game_with(common::single_quest_catalog(50), GameRules::default(), 8);
    for _ in 0..49 {
        let done = game
            .apply_quest_progress(5, QuestPeriod::Daily, quest_tags::CLICKS, 1)
            .expect("progress");
        assert!(done.is_empty());
    }
    let quests = game.list_quests(5, QuestPeriod::Daily).expect("quests");
    assert_eq!((quests[0].progress, quests[0].completed), (49, false));

    let done = game
        .apply_quest_progress(5, QuestPeriod::Daily, quest_tags::CLICKS, 1)
        .expect("fiftieth");
    assert_eq!(done.len(), 1);
    let player = game.store().get_player(5).unwrap();
    assert_eq!(player.gold, 40);
    assert_eq!(player.exp, 15);
}
