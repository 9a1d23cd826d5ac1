use crate::model::*;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamLine {
    pub team_id: TeamId,
    pub name: String,
    pub roster: usize,
    pub players: usize,
    pub maps_played: u32,
    pub maps_won: u32,
}

// Per-team counts, most maps first.
pub fn team_lines(teams: &Teams, maps: &Maps) -> Vec<TeamLine> {
    let mut lines: Vec<TeamLine> = teams
        .iter()
        .map(|(&team_id, t)| TeamLine {
            team_id,
            name: t.name.clone(),
            roster: t.major_roster.len(),
            players: t.players.len(),
            ..Default::default()
        })
        .collect();

    for map in maps.values() {
        for line in lines.iter_mut() {
            if !map.teams().contains(line.team_id) { continue; }

            line.maps_played += 1;
            if map.winner() == Some(line.team_id) {
                line.maps_won += 1;
            }
        }
    }

    lines.sort_by(|a, b| b.maps_played.cmp(&a.maps_played).then(a.name.cmp(&b.name)));
    lines
}

pub fn output_report(teams: &Teams, maps: &Maps, matches: &Matches, events: &Events) {
    println!("{} events | {} matches | {} maps | {} teams", events.len(), matches.len(), maps.len(), teams.len());

    for (i, t) in team_lines(teams, maps).iter().enumerate() {
        println!("|{0:3}. | {1:20} | roster {2:2} | players {3:3} | maps {4:4} | won {5:4}",
            i + 1,
            t.name,
            t.roster,
            t.players,
            t.maps_played,
            t.maps_won,
        );
    }
}
