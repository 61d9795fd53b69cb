// Feature/label extraction from one player's career record.
//
// Eligibility is all-or-nothing: a row exists only when the height parses,
// the rookie season clears the quality floor, all five follow-up seasons
// (rookie+1..rookie+5) are present, and every one of the 19 numeric fields
// is finite. Anything else excludes the player silently — messy historical
// records are expected, not exceptional.

use crate::model::{Stat, TargetKey, N_FEATURES};
use crate::source::CareerRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One labeled training example. Field order is the dataset CSV schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureLabelRow {
    pub player_id: i64,
    pub height_in: f64,
    pub rookie_ppg: f64,
    pub rookie_apg: f64,
    pub rookie_rpg: f64,
    pub rookie_start: i32,
    pub ppg_y2: f64,
    pub ppg_y3: f64,
    pub ppg_y4: f64,
    pub ppg_y5: f64,
    pub ppg_y6: f64,
    pub apg_y2: f64,
    pub apg_y3: f64,
    pub apg_y4: f64,
    pub apg_y5: f64,
    pub apg_y6: f64,
    pub rpg_y2: f64,
    pub rpg_y3: f64,
    pub rpg_y4: f64,
    pub rpg_y5: f64,
    pub rpg_y6: f64,
}

impl FeatureLabelRow {
    /// The shared 4-feature input vector, in regressor input order.
    pub fn features(&self) -> [f64; N_FEATURES] {
        [
            self.height_in,
            self.rookie_ppg,
            self.rookie_apg,
            self.rookie_rpg,
        ]
    }

    /// The label column for one target.
    pub fn label(&self, key: TargetKey) -> f64 {
        match (key.stat(), key.year()) {
            (Stat::Ppg, 2) => self.ppg_y2,
            (Stat::Ppg, 3) => self.ppg_y3,
            (Stat::Ppg, 4) => self.ppg_y4,
            (Stat::Ppg, 5) => self.ppg_y5,
            (Stat::Ppg, 6) => self.ppg_y6,
            (Stat::Apg, 2) => self.apg_y2,
            (Stat::Apg, 3) => self.apg_y3,
            (Stat::Apg, 4) => self.apg_y4,
            (Stat::Apg, 5) => self.apg_y5,
            (Stat::Apg, 6) => self.apg_y6,
            (Stat::Rpg, 2) => self.rpg_y2,
            (Stat::Rpg, 3) => self.rpg_y3,
            (Stat::Rpg, 4) => self.rpg_y4,
            (Stat::Rpg, 5) => self.rpg_y5,
            (Stat::Rpg, 6) => self.rpg_y6,
            // TargetKey construction guarantees year 2..=6.
            _ => f64::NAN,
        }
    }

    /// True when every feature and label field is finite. Rows straight out
    /// of `extract` always are; this re-check guards CSVs edited by hand.
    pub fn all_finite(&self) -> bool {
        let mut values = vec![
            self.height_in,
            self.rookie_ppg,
            self.rookie_apg,
            self.rookie_rpg,
        ];
        values.extend(TargetKey::all().map(|k| self.label(k)));
        values.iter().all(|v| v.is_finite())
    }
}

/// Parse a height descriptor like "6-7" into inches.
pub fn parse_height_inches(height: &str) -> Option<f64> {
    let (feet, inches) = height.trim().split_once('-')?;
    let feet: u32 = feet.trim().parse().ok()?;
    let inches: u32 = inches.trim().parse().ok()?;
    Some(f64::from(feet * 12 + inches))
}

/// Derive one feature/label row from a career record, or `None` when the
/// record does not qualify.
pub fn extract(record: &CareerRecord, min_rookie_season: i32) -> Option<FeatureLabelRow> {
    let height_in = parse_height_inches(record.height.as_deref()?)?;

    let mut seasons = record.seasons.clone();
    seasons.sort_by_key(|s| s.season_start);
    let rookie = seasons.first()?;
    let rookie_start = rookie.season_start;
    if rookie_start < min_rookie_season {
        return None;
    }

    let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
    let rookie_ppg = finite(rookie.pts)?;
    let rookie_apg = finite(rookie.ast)?;
    let rookie_rpg = finite(rookie.reb)?;

    // Season start years are unique per player; on dirty duplicates the
    // later entry wins, matching dataset-level dedup semantics.
    let by_year: HashMap<i32, &crate::source::SeasonLine> =
        seasons.iter().map(|s| (s.season_start, s)).collect();

    // All five follow-up seasons must exist at exact career offsets; a gap
    // anywhere in years 2..6 disqualifies the player.
    let mut labels = [[0.0f64; 3]; 5];
    for (offset, slot) in labels.iter_mut().enumerate() {
        let line = by_year.get(&(rookie_start + offset as i32 + 1))?;
        *slot = [finite(line.pts)?, finite(line.ast)?, finite(line.reb)?];
    }

    Some(FeatureLabelRow {
        player_id: record.player_id,
        height_in,
        rookie_ppg,
        rookie_apg,
        rookie_rpg,
        rookie_start,
        ppg_y2: labels[0][0],
        ppg_y3: labels[1][0],
        ppg_y4: labels[2][0],
        ppg_y5: labels[3][0],
        ppg_y6: labels[4][0],
        apg_y2: labels[0][1],
        apg_y3: labels[1][1],
        apg_y4: labels[2][1],
        apg_y5: labels[3][1],
        apg_y6: labels[4][1],
        rpg_y2: labels[0][2],
        rpg_y3: labels[1][2],
        rpg_y4: labels[2][2],
        rpg_y5: labels[3][2],
        rpg_y6: labels[4][2],
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SeasonLine;

    fn season(start: i32, pts: f64, ast: f64, reb: f64) -> SeasonLine {
        SeasonLine {
            season_start: start,
            pts: Some(pts),
            ast: Some(ast),
            reb: Some(reb),
        }
    }

    /// Six contiguous seasons starting in 2000, with stats derived from the
    /// season index so assertions can pin individual cells.
    fn full_career(player_id: i64) -> CareerRecord {
        CareerRecord {
            player_id,
            height: Some("6-7".to_string()),
            seasons: (0..6)
                .map(|k| {
                    season(
                        2000 + k,
                        10.0 + k as f64,
                        3.0 + k as f64,
                        4.0 + k as f64,
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn full_career_produces_a_row() {
        let row = extract(&full_career(7), 1996).expect("should qualify");
        assert_eq!(row.player_id, 7);
        assert!((row.height_in - 79.0).abs() < f64::EPSILON);
        assert_eq!(row.rookie_start, 2000);
        assert!((row.rookie_ppg - 10.0).abs() < f64::EPSILON);
        assert!((row.ppg_y2 - 11.0).abs() < f64::EPSILON);
        assert!((row.ppg_y6 - 15.0).abs() < f64::EPSILON);
        assert!((row.apg_y4 - 6.0).abs() < f64::EPSILON);
        assert!((row.rpg_y6 - 9.0).abs() < f64::EPSILON);
        assert!(row.all_finite());
    }

    #[test]
    fn unsorted_seasons_are_handled() {
        let mut record = full_career(7);
        record.seasons.reverse();
        let row = extract(&record, 1996).expect("order must not matter");
        assert_eq!(row.rookie_start, 2000);
        assert!((row.rookie_ppg - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn any_missing_followup_season_excludes() {
        // Exhaustive gap positions: dropping the season at offset k removes
        // year k+1 of the career.
        for gap in 1..=5usize {
            let mut record = full_career(7);
            record.seasons.remove(gap);
            assert!(
                extract(&record, 1996).is_none(),
                "gap at offset {gap} must exclude the player"
            );
        }
    }

    #[test]
    fn single_season_career_excludes() {
        let mut record = full_career(7);
        record.seasons.truncate(1);
        assert!(extract(&record, 1996).is_none());
    }

    #[test]
    fn empty_career_excludes() {
        let record = CareerRecord {
            player_id: 7,
            height: Some("6-7".to_string()),
            seasons: vec![],
        };
        assert!(extract(&record, 1996).is_none());
    }

    #[test]
    fn rookie_before_floor_excludes() {
        let record = full_career(7);
        assert!(extract(&record, 2001).is_none());
        assert!(extract(&record, 2000).is_some());
    }

    #[test]
    fn malformed_heights_exclude() {
        for bad in [None, Some(""), Some("tall"), Some("6"), Some("6-"), Some("-7"), Some("6-7-8")] {
            let mut record = full_career(7);
            record.height = bad.map(|s| s.to_string());
            assert!(
                extract(&record, 1996).is_none(),
                "height {bad:?} must exclude the player"
            );
        }
    }

    #[test]
    fn missing_stat_field_excludes() {
        // In the rookie season.
        let mut record = full_career(7);
        record.seasons[0].ast = None;
        assert!(extract(&record, 1996).is_none());

        // In a follow-up season.
        let mut record = full_career(7);
        record.seasons[4].reb = None;
        assert!(extract(&record, 1996).is_none());
    }

    #[test]
    fn non_finite_stat_excludes() {
        let mut record = full_career(7);
        record.seasons[2].pts = Some(f64::NAN);
        assert!(extract(&record, 1996).is_none());

        let mut record = full_career(7);
        record.seasons[0].pts = Some(f64::INFINITY);
        assert!(extract(&record, 1996).is_none());
    }

    #[test]
    fn extra_trailing_seasons_are_ignored() {
        let mut record = full_career(7);
        record.seasons.push(season(2006, 20.0, 9.0, 10.0));
        record.seasons.push(season(2007, 21.0, 9.5, 10.5));
        let row = extract(&record, 1996).expect("should still qualify");
        assert!((row.ppg_y6 - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_height_variants() {
        assert_eq!(parse_height_inches("6-7"), Some(79.0));
        assert_eq!(parse_height_inches(" 7-0 "), Some(84.0));
        assert_eq!(parse_height_inches("5-11"), Some(71.0));
        assert_eq!(parse_height_inches("6"), None);
        assert_eq!(parse_height_inches(""), None);
        assert_eq!(parse_height_inches("6-seven"), None);
        assert_eq!(parse_height_inches("6-7-8"), None);
    }

    #[test]
    fn label_lookup_matches_fields() {
        let row = extract(&full_career(7), 1996).unwrap();
        let key = |s, y| TargetKey::new(s, y).unwrap();
        assert_eq!(row.label(key(Stat::Ppg, 2)), row.ppg_y2);
        assert_eq!(row.label(key(Stat::Apg, 5)), row.apg_y5);
        assert_eq!(row.label(key(Stat::Rpg, 6)), row.rpg_y6);
    }
}
