//! HP ceilings scaled to the number of participants.

pub const DEFAULT_AVG_TEAM_SIZE: u32 = 4;
pub const BOSS_HP_PER_STUDENT: f64 = 1.5;
pub const CLASS_HP_PER_STUDENT: f64 = 1.2;
pub const MIN_CLASS_HP: u32 = 10;

/// `max(base_hp, round(team_count * avg_team_size * 1.5))`
pub fn boss_hp(base_hp: u32, team_count: usize, avg_team_size: u32) -> u32 {
    base_hp.max(scaled(team_count, avg_team_size, BOSS_HP_PER_STUDENT))
}

/// `max(10, round(team_count * avg_team_size * 1.2))`
pub fn class_hp(team_count: usize, avg_team_size: u32) -> u32 {
    MIN_CLASS_HP.max(scaled(team_count, avg_team_size, CLASS_HP_PER_STUDENT))
}

fn scaled(team_count: usize, avg_team_size: u32, per_student: f64) -> u32 {
    let students = team_count as f64 * f64::from(avg_team_size);
    // `as` saturates, so absurd cohorts clamp to u32::MAX instead of wrapping.
    (students * per_student).round() as u32
}
