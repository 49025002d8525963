use bossraid::battle::{build_battle, Battle, BattleStatus, NewBattle, Question, TeamEntry};
use bossraid::combat::{
    activate_ability, resolve_answer, AbilityError, AbilityKind, BossDefinition, Catalog,
    Difficulty, Rng,
};
use chrono::Utc;
use proptest::prelude::*;

fn question(difficulty: Option<Difficulty>) -> Question {
    Question {
        prompt: "pick the first".to_string(),
        options: vec!["right".into(), "wrong".into(), "also wrong".into()],
        correct_index: 0,
        explanation: "The first one.".to_string(),
        difficulty,
        source: None,
    }
}

fn battle(teams: &[&str], questions: Vec<Question>) -> Battle {
    build_battle(
        NewBattle {
            boss_id: "dragon".into(),
            questions,
            teams: teams.iter().map(|id| TeamEntry::new(*id, id.to_uppercase(), "")).collect(),
            avg_team_size: None,
        },
        &Catalog::builtin(),
        &mut Rng::new(99),
        Utc::now(),
    )
    .expect("battle")
}

fn set_boss_hp(battle: &mut Battle, max: u32, current: u32) {
    battle.boss.max_hp = max;
    battle.boss.current_hp = current;
}

#[test]
fn critical_hit_doubles_normal_damage() {
    let catalog = Catalog::builtin();
    let mut battle = battle(&["red"], vec![question(Some(Difficulty::Normal)); 3]);
    set_boss_hp(&mut battle, 10, 10);
    battle.team_progress.get_mut("red").expect("team").critical_hit_active = true;

    let result = resolve_answer(&mut battle, "red", 0, &catalog, &mut Rng::new(1), Utc::now())
        .expect("resolved");
    assert!(result.correct);
    assert!(result.critical_hit);
    assert_eq!(result.damage, 4);
    assert_eq!(battle.boss.current_hp, 6);
    assert!(!battle.team_progress["red"].critical_hit_active);
}

#[test]
fn shield_blocks_counterattack() {
    let catalog = Catalog::builtin();
    let mut battle = battle(&["red"], vec![question(None); 3]);
    let class_before = battle.class_hp.current;
    let boss_before = battle.boss.current_hp;
    battle.team_progress.get_mut("red").expect("team").shield_active = true;

    let result = resolve_answer(&mut battle, "red", 1, &catalog, &mut Rng::new(1), Utc::now())
        .expect("resolved");
    assert!(!result.correct);
    assert!(result.shielded);
    assert_eq!(battle.class_hp.current, class_before);
    assert_eq!(battle.boss.current_hp, boss_before);
    let team = &battle.team_progress["red"];
    assert!(!team.shield_active);
    assert_eq!(team.wrong_count, 1);
    assert!(battle.log.latest().is_some_and(|entry| entry.shielded));
}

#[test]
fn shield_outlasts_correct_answers_until_the_next_miss() {
    let catalog = Catalog::builtin();
    let mut battle = battle(&["red"], vec![question(None); 4]);
    let class_before = battle.class_hp.current;
    battle.team_progress.get_mut("red").expect("team").shield_active = true;
    let mut rng = Rng::new(8);

    let hit = resolve_answer(&mut battle, "red", 0, &catalog, &mut rng, Utc::now()).expect("hit");
    assert!(hit.correct);
    assert!(!hit.shielded);
    assert!(battle.team_progress["red"].shield_active);

    let miss = resolve_answer(&mut battle, "red", 2, &catalog, &mut rng, Utc::now()).expect("miss");
    assert!(!miss.correct);
    assert!(miss.shielded);
    assert_eq!(battle.class_hp.current, class_before);
    assert!(!battle.team_progress["red"].shield_active);
}

#[test]
fn critical_hit_outlasts_misses_until_the_next_hit() {
    let catalog = Catalog::builtin();
    let mut battle = battle(&["red"], vec![question(None); 4]);
    set_boss_hp(&mut battle, 30, 30);
    battle.class_hp.max = 100;
    battle.class_hp.current = 100;
    battle.team_progress.get_mut("red").expect("team").critical_hit_active = true;
    let mut rng = Rng::new(8);

    let miss = resolve_answer(&mut battle, "red", 1, &catalog, &mut rng, Utc::now()).expect("miss");
    assert!(!miss.correct);
    assert!(!miss.critical_hit);
    assert!(battle.team_progress["red"].critical_hit_active);

    let boss_before = battle.boss.current_hp;
    let hit = resolve_answer(&mut battle, "red", 0, &catalog, &mut rng, Utc::now()).expect("hit");
    assert!(hit.critical_hit);
    assert_eq!(hit.damage, 4);
    assert_eq!(battle.boss.current_hp, boss_before - 4);
    assert!(!battle.team_progress["red"].critical_hit_active);
}

#[test]
fn running_out_of_questions_is_a_defeat() {
    let catalog = Catalog::builtin();
    let mut battle = battle(&["red"], vec![question(None)]);
    set_boss_hp(&mut battle, 30, 3);
    battle.class_hp.current = 5;
    battle.team_progress.get_mut("red").expect("team").shield_active = true;

    let result = resolve_answer(&mut battle, "red", 2, &catalog, &mut Rng::new(1), Utc::now())
        .expect("resolved");
    assert!(result.team_finished);
    assert_eq!(battle.boss.current_hp, 3);
    assert_eq!(battle.class_hp.current, 5);
    assert_eq!(result.status, BattleStatus::Defeat);
    assert_eq!(battle.status, BattleStatus::Defeat);
    assert!(battle.ended_at.is_some());
}

#[test]
fn finishing_blow_floors_at_zero_and_wins() {
    let catalog = Catalog::builtin();
    let mut battle = battle(&["red", "blue"], vec![question(Some(Difficulty::Hard)); 2]);
    set_boss_hp(&mut battle, 30, 2);

    let result = resolve_answer(&mut battle, "blue", 0, &catalog, &mut Rng::new(1), Utc::now())
        .expect("resolved");
    assert_eq!(result.damage, 3);
    assert_eq!(battle.boss.current_hp, 0);
    assert_eq!(result.status, BattleStatus::Victory);
    assert_eq!(battle.team_progress["blue"].damage, 3);
}

#[test]
fn scaled_boss_hp_for_two_teams() {
    let mut catalog = Catalog::builtin();
    catalog.bosses = vec![BossDefinition {
        id: "slime".into(),
        name: "Slime".into(),
        icon: String::new(),
        base_hp: 10,
        description: String::new(),
    }];
    let battle = build_battle(
        NewBattle {
            boss_id: "slime".into(),
            questions: vec![question(None); 4],
            teams: vec![TeamEntry::new("a", "A", ""), TeamEntry::new("b", "B", "")],
            avg_team_size: Some(4),
        },
        &catalog,
        &mut Rng::new(3),
        Utc::now(),
    )
    .expect("battle");
    assert_eq!(battle.boss.max_hp, 12);
    assert_eq!(battle.boss.current_hp, 12);
    assert_eq!(battle.class_hp.max, 10);
}

#[test]
fn terminal_battles_ignore_answers_and_abilities() {
    let catalog = Catalog::builtin();
    let mut battle = battle(&["red"], vec![question(None); 3]);
    battle.conclude(BattleStatus::Victory, Utc::now());
    let frozen = battle.clone();

    assert!(resolve_answer(&mut battle, "red", 0, &catalog, &mut Rng::new(1), Utc::now()).is_none());
    assert_eq!(
        activate_ability(&mut battle, "red", AbilityKind::Shield, &catalog, Utc::now()),
        Err(AbilityError::BattleInactive)
    );
    assert_eq!(battle, frozen);
}

#[test]
fn critical_hit_is_consumed_once_and_cools_down() {
    let catalog = Catalog::builtin();
    let mut battle = battle(&["red"], vec![question(Some(Difficulty::Easy)); 6]);
    let mut rng = Rng::new(5);

    activate_ability(&mut battle, "red", AbilityKind::CriticalHit, &catalog, Utc::now())
        .expect("armed");
    assert_eq!(
        activate_ability(&mut battle, "red", AbilityKind::CriticalHit, &catalog, Utc::now()),
        Err(AbilityError::AlreadyActive("critical hit"))
    );
    assert_eq!(battle.team_progress["red"].crit_cooldown, 4);

    let first = resolve_answer(&mut battle, "red", 0, &catalog, &mut rng, Utc::now()).expect("first");
    let second = resolve_answer(&mut battle, "red", 0, &catalog, &mut rng, Utc::now()).expect("second");
    assert_eq!((first.damage, first.critical_hit), (2, true));
    assert_eq!((second.damage, second.critical_hit), (1, false));
    assert_eq!(battle.team_progress["red"].crit_cooldown, 2);

    assert_eq!(
        activate_ability(&mut battle, "red", AbilityKind::CriticalHit, &catalog, Utc::now()),
        Err(AbilityError::OnCooldown("critical hit", 2))
    );
}

#[test]
fn unknown_team_is_a_no_op() {
    let catalog = Catalog::builtin();
    let mut battle = battle(&["red"], vec![question(None); 2]);
    let before = battle.clone();
    assert!(resolve_answer(&mut battle, "green", 0, &catalog, &mut Rng::new(1), Utc::now()).is_none());
    assert_eq!(battle, before);
}

proptest! {
    #[test]
    fn hp_stays_in_bounds_and_progress_is_monotonic(
        seed in any::<u64>(),
        moves in prop::collection::vec((0usize..3, 0usize..3, any::<bool>()), 1..80),
    ) {
        let catalog = Catalog::builtin();
        let ids = ["a", "b", "c"];
        let mut battle = battle(&ids, vec![question(Some(Difficulty::Normal)); 8]);
        let mut rng = Rng::new(seed);

        for (team, answer, shield_first) in moves {
            let id = ids[team];
            if shield_first {
                let _ = activate_ability(&mut battle, id, AbilityKind::Shield, &catalog, Utc::now());
            }
            let before = battle.team_progress[id].current_index;
            let was_active = battle.is_active();
            let resolved = resolve_answer(&mut battle, id, answer, &catalog, &mut rng, Utc::now());
            let after = battle.team_progress[id].current_index;

            prop_assert!(battle.boss.current_hp <= battle.boss.max_hp);
            prop_assert!(battle.class_hp.current <= battle.class_hp.max);
            prop_assert!(after <= battle.team_progress[id].question_order.len());
            match resolved {
                Some(_) => {
                    prop_assert!(was_active);
                    prop_assert_eq!(after, before + 1);
                }
                None => prop_assert_eq!(after, before),
            }
            prop_assert!(battle.log.len() <= 50);
        }
    }
}
