// src/stats.rs

use crate::model::{Competitor, Ratio};

/// Gives unplaced podium entries position 1 where the competitor holds an
/// otherwise unmatched win at the same event.
pub fn reconcile_wins(competitor: &mut Competitor) {
    for win in &competitor.wins {
        let already_placed = competitor
            .podiums
            .iter()
            .filter(|p| p.position == Some(1) && p.event.same_as(&win.event))
            .count();
        let wins_here = competitor.wins.iter().filter(|w| w.event.same_as(&win.event)).count();
        if already_placed >= wins_here {
            continue;
        }
        if let Some(podium) = competitor
            .podiums
            .iter_mut()
            .find(|p| p.position.is_none() && p.event.same_as(&win.event))
        {
            podium.position = Some(1);
        }
    }
}

/// First through last season with any result, inclusive
pub fn career_length(competitor: &Competitor) -> Option<u32> {
    let (min, max) = competitor.result_years().fold(None, |acc: Option<(i32, i32)>, year| match acc {
        None => Some((year, year)),
        Some((lo, hi)) => Some((lo.min(year), hi.max(year))),
    })?;
    u32::try_from(max - min + 1).ok()
}

/// Derives the summary numbers from the accumulated results.
///
/// A pre-seeded `number_of_mains` that is at least the parsed count is kept.
/// Percentages over zero mains come out as [`Ratio::NotANumber`].
pub fn compute_stats(competitor: &mut Competitor) {
    competitor.number_of_wins = competitor.wins.len() as u32;
    competitor.number_of_podiums = competitor.podiums.len() as u32;

    let parsed_mains = competitor.mains.len() as u32;
    let mains = match competitor.number_of_mains {
        Some(preset) if preset >= parsed_mains => preset,
        _ => parsed_mains,
    };
    competitor.number_of_mains = Some(mains);

    competitor.seasons_active = career_length(competitor);
    competitor.win_percentage = Ratio::percentage(competitor.number_of_wins, mains);
    competitor.podium_percentage = Ratio::percentage(competitor.number_of_podiums, mains);
}
