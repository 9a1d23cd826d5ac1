use crate::model::PlayerId;

// Number of roster players who were actually fielded. Duplicates in `fielded` count once.
pub fn roster_overlap(roster: &[PlayerId], fielded: &[PlayerId]) -> usize {
    roster.iter().filter(|id| fielded.contains(id)).count()
}

// Pulls the numeric id that follows `prefix` out of a link such as
// "/stats/players/7998/s1mple" or "https://www.hltv.org/matches/2352373/navi-vs-g2".
pub fn id_after(href: &str, prefix: &str) -> Option<u32> {
    let start = href.find(prefix)? + prefix.len();
    href[start..]
        .split(['/', '?', '#'])
        .next()
        .and_then(|s| s.parse().ok())
}

// Same as `id_after`, but for query parameters like "?event=4866&startDate=..."
pub fn query_param(href: &str, name: &str) -> Option<u32> {
    let query = href.split_once('?')?.1;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .and_then(|(_, v)| v.parse().ok())
}
