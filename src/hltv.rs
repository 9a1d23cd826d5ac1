// Blocking HLTV client. One request at a time with a polite pause in between; pages are
// parsed with CSS selectors and every id is taken from the links on the page.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::DatasetContext;
use crate::error::SourceError;
use crate::model::*;
use crate::source::{HistoryQuery, MapAppearance, MapStats, PlayerMapStats, StatsSource, TeamMapStats};
use crate::util::{id_after, query_param};

pub struct HltvClient {
    http: reqwest::blocking::Client,
    base_url: String,
    delay: Duration,
    jitter_ms: u64,
    last_request: Cell<Option<Instant>>,
    // Stats pages are needed by several stages of the same run
    map_cache: RefCell<BTreeMap<MapId, MapStats>>,
}

impl HltvClient {
    pub fn new(ctx: &DatasetContext) -> Result<Self, SourceError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("major_dataset/{}", env!("CARGO_PKG_VERSION")))
            .timeout(ctx.timeout())
            .build()
            .map_err(|source| SourceError::Http { url: ctx.base_url.clone(), source })?;

        Ok(Self {
            http,
            base_url: ctx.base_url.trim_end_matches('/').to_string(),
            delay: ctx.request_delay(),
            jitter_ms: ctx.request_jitter_ms,
            last_request: Cell::new(None),
            map_cache: RefCell::new(BTreeMap::new()),
        })
    }

    fn pause(&self) {
        let jitter = if self.jitter_ms > 0 { rand::rng().random_range(0..=self.jitter_ms) } else { 0 };
        let wait = self.delay + Duration::from_millis(jitter);

        if let Some(last) = self.last_request.get() {
            let elapsed = last.elapsed();
            if elapsed < wait {
                thread::sleep(wait - elapsed);
            }
        }
        self.last_request.set(Some(Instant::now()));
    }

    fn get_document(&self, path: &str) -> Result<Html, SourceError> {
        self.pause();
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET");

        let response = self.http.get(&url).send().map_err(|source| SourceError::Http { url: url.clone(), source })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status { url, status: status.as_u16() });
        }

        let body = response.text().map_err(|source| SourceError::Http { url, source })?;
        Ok(Html::parse_document(&body))
    }
}

impl StatsSource for HltvClient {
    fn get_event_teams(&self, event_id: EventId) -> Result<Vec<(TeamId, String)>, SourceError> {
        let doc = self.get_document(&format!("/events/{event_id}/x"))?;
        parse_event_teams(&doc)
    }

    fn get_team_players(&self, team_id: TeamId, event_id: EventId) -> Result<Vec<(PlayerId, Player)>, SourceError> {
        let doc = self.get_document(&format!("/stats/teams/players/{team_id}/x?event={event_id}"))?;
        parse_team_players(&doc)
    }

    fn team_map_history(&self, team_id: TeamId, query: &HistoryQuery) -> Result<Vec<MapAppearance>, SourceError> {
        let mut path = format!("/stats/teams/matches/{team_id}/x");
        if let Some(cutoff) = query.cutoff {
            path.push_str(&format!("?endDate={}", cutoff.format("%Y-%m-%d")));
        }
        let rows = parse_team_history(&self.get_document(&path)?)?;

        // Lineups are only on the stats page, so skip the rows that can't qualify anyway
        let mut appearances = Vec::new();
        for row in rows {
            if !query.universe.contains(&row.opponent_id) || query.cutoff.is_some_and(|c| row.date > c) {
                continue;
            }

            let stats = match self.get_map_stats(row.map_id) {
                Ok(stats) => stats,
                Err(e) => {
                    warn!(team_id, map_id = row.map_id, error = %e, "lineup unavailable, row skipped");
                    continue;
                }
            };
            let Some(side) = stats.side(team_id) else {
                warn!(team_id, map_id = row.map_id, "team missing from its own map page, row skipped");
                continue;
            };

            appearances.push(MapAppearance {
                map_id: row.map_id,
                date: row.date,
                team_id,
                opponent_id: row.opponent_id,
                lineup: side.lineup(),
            });
        }

        Ok(appearances)
    }

    fn get_map_stats(&self, map_id: MapId) -> Result<MapStats, SourceError> {
        if let Some(stats) = self.map_cache.borrow().get(&map_id) {
            return Ok(stats.clone());
        }

        let doc = self.get_document(&format!("/stats/matches/mapstatsid/{map_id}/x"))?;
        let stats = parse_map_stats(map_id, &doc)?;
        self.map_cache.borrow_mut().insert(map_id, stats.clone());
        Ok(stats)
    }

    fn get_match_picks(&self, match_id: MatchId) -> Result<Vec<MapPick>, SourceError> {
        let doc = self.get_document(&format!("/matches/{match_id}/x"))?;
        Ok(parse_veto(&doc))
    }
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::Selector(format!("{css}: {e}")))
}

fn text_of(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn link_id(el: &ElementRef, prefix: &'static str) -> Result<u32, SourceError> {
    let href = el.value().attr("href").unwrap_or_default();
    id_after(href, prefix).ok_or_else(|| SourceError::Parse { what: prefix, value: href.to_string() })
}

pub(crate) fn parse_event_teams(doc: &Html) -> Result<Vec<(TeamId, String)>, SourceError> {
    let team_sel = selector("div.teams-attending div.team-name a")?;

    let mut teams = Vec::new();
    for a in doc.select(&team_sel) {
        let id = link_id(&a, "/team/")?;
        if teams.iter().all(|(known, _)| *known != id) {
            teams.push((id, text_of(&a)));
        }
    }

    if teams.is_empty() {
        return Err(SourceError::ElementNotFound { context: "attending teams (div.teams-attending)" });
    }
    Ok(teams)
}

pub(crate) fn parse_team_players(doc: &Html) -> Result<Vec<(PlayerId, Player)>, SourceError> {
    let row_sel = selector("table.player-ratings-table tbody tr")?;
    let link_sel = selector("td.playerCol a")?;
    let flag_sel = selector("td.playerCol img.flag")?;
    let maps_sel = selector("td.statsDetail")?;

    let mut players = Vec::new();
    for row in doc.select(&row_sel) {
        let Some(a) = row.select(&link_sel).next() else { continue };
        let id = link_id(&a, "/stats/players/")?;

        let mut player = Player::new(text_of(&a));
        if let Some(country) = row.select(&flag_sel).next().and_then(|img| img.value().attr("title")) {
            player.attributes.insert("country".to_string(), Value::from(country));
        }
        if let Some(maps) = row.select(&maps_sel).next().and_then(|td| text_of(&td).parse::<u32>().ok()) {
            player.attributes.insert("maps_played".to_string(), Value::from(maps));
        }
        players.push((id, player));
    }

    if players.is_empty() {
        return Err(SourceError::ElementNotFound { context: "player ratings table" });
    }
    Ok(players)
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HistoryRow {
    pub map_id: MapId,
    pub date: NaiveDate,
    pub opponent_id: TeamId,
}

pub(crate) fn parse_team_history(doc: &Html) -> Result<Vec<HistoryRow>, SourceError> {
    let row_sel = selector("table.stats-table tbody tr")?;
    let time_sel = selector("td.time a")?;
    let opponent_sel = selector("td a[href*=\"/stats/teams/\"]")?;

    let mut rows = Vec::new();
    for row in doc.select(&row_sel) {
        let (Some(time), Some(opponent)) = (row.select(&time_sel).next(), row.select(&opponent_sel).next()) else {
            continue;
        };

        let raw_date = text_of(&time);
        let date = NaiveDate::parse_from_str(&raw_date, "%d/%m/%y")
            .map_err(|_| SourceError::Parse { what: "history date", value: raw_date })?;

        rows.push(HistoryRow {
            map_id: link_id(&time, "/mapstatsid/")?,
            date,
            opponent_id: link_id(&opponent, "/stats/teams/")?,
        });
    }
    Ok(rows)
}

pub(crate) fn parse_map_stats(map_id: MapId, doc: &Html) -> Result<MapStats, SourceError> {
    let info_sel = selector("div.match-info-box")?;
    let info = doc
        .select(&info_sel)
        .next()
        .ok_or(SourceError::ElementNotFound { context: "match info box (div.match-info-box)" })?;

    let unix_sel = selector("div.small-text span[data-unix]")?;
    let raw_unix = info
        .select(&unix_sel)
        .next()
        .and_then(|s| s.value().attr("data-unix"))
        .ok_or(SourceError::ElementNotFound { context: "map date (span[data-unix])" })?;
    let date = raw_unix
        .parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| SourceError::Parse { what: "map date", value: raw_unix.to_string() })?;

    let event_sel = selector("a.block.text-ellipsis[href*=\"event\"]")?;
    let event = info
        .select(&event_sel)
        .next()
        .ok_or(SourceError::ElementNotFound { context: "event link (a.block.text-ellipsis)" })?;
    let event_href = event.value().attr("href").unwrap_or_default();
    let event_id = query_param(event_href, "event")
        .or_else(|| id_after(event_href, "/events/"))
        .ok_or_else(|| SourceError::Parse { what: "event id", value: event_href.to_string() })?;

    // The map name is the text following the "Map" label
    let texts: Vec<&str> = info.text().flat_map(str::lines).map(str::trim).filter(|t| !t.is_empty()).collect();
    let map_name = texts
        .iter()
        .position(|t| *t == "Map")
        .and_then(|i| texts.get(i + 1))
        .ok_or(SourceError::ElementNotFound { context: "map name" })?
        .to_string();

    let match_sel = selector("a.match-page-link")?;
    let match_link = doc
        .select(&match_sel)
        .next()
        .ok_or(SourceError::ElementNotFound { context: "match page link (a.match-page-link)" })?;

    let tables_sel = selector("table.stats-table.totalstats")?;
    let mut tables = doc.select(&tables_sel);
    let left_players = tables.next().map(|t| parse_player_rows(&t)).transpose()?.unwrap_or_default();
    let right_players = tables.next().map(|t| parse_player_rows(&t)).transpose()?.unwrap_or_default();

    Ok(MapStats {
        map_id,
        match_id: link_id(&match_link, "/matches/")?,
        event_id,
        event_name: text_of(&event),
        date,
        map_name,
        team_1: parse_side(&info, "team-left", left_players)?,
        team_2: parse_side(&info, "team-right", right_players)?,
    })
}

fn parse_side(info: &ElementRef, class: &str, players: Vec<PlayerMapStats>) -> Result<TeamMapStats, SourceError> {
    let link_sel = selector(&format!("div.{class} a"))?;
    let score_sel = selector(&format!("div.{class} div.bold"))?;

    let link = info
        .select(&link_sel)
        .next()
        .ok_or(SourceError::ElementNotFound { context: "team link in match info box" })?;
    let raw_score = info.select(&score_sel).next().map(|s| text_of(&s)).unwrap_or_default();
    let score = raw_score
        .parse()
        .map_err(|_| SourceError::Parse { what: "map score", value: raw_score })?;

    Ok(TeamMapStats {
        team_id: link_id(&link, "/stats/teams/")?,
        name: text_of(&link),
        score,
        players,
    })
}

fn parse_player_rows(table: &ElementRef) -> Result<Vec<PlayerMapStats>, SourceError> {
    let row_sel = selector("tbody tr")?;
    let player_sel = selector("td.st-player a")?;
    let cell_sel = selector("td")?;

    let mut players = Vec::new();
    for row in table.select(&row_sel) {
        let Some(a) = row.select(&player_sel).next() else { continue };

        let mut stats = BTreeMap::new();
        for td in row.select(&cell_sel) {
            let Some(key) = td.value().classes().find_map(|c| c.strip_prefix("st-")) else { continue };
            if key == "player" {
                continue;
            }
            stats.insert(key.to_string(), stat_value(&text_of(&td)));
        }

        players.push(PlayerMapStats {
            player_id: link_id(&a, "/stats/players/")?,
            name: text_of(&a),
            stats,
        });
    }
    Ok(players)
}

// "24 (5)" -> 24, "75.0%" -> 75.0, "+3" -> 3; anything else is kept as text
fn stat_value(raw: &str) -> Value {
    let head = raw.split_whitespace().next().unwrap_or_default().trim_end_matches('%');
    if let Ok(i) = head.parse::<i64>() {
        return Value::from(i);
    }
    match head.parse::<f64>() {
        Ok(f) => Value::from(f),
        Err(_) => Value::from(raw),
    }
}

pub(crate) fn parse_veto(doc: &Html) -> Vec<MapPick> {
    let Ok(line_sel) = selector("div.veto-box div.padding > div") else {
        return Vec::new();
    };
    doc.select(&line_sel).filter_map(|el| parse_veto_line(&text_of(&el))).collect()
}

// "3. Natus Vincere picked Ancient", "1. G2 removed Vertigo", "7. Dust2 was left over"
pub(crate) fn parse_veto_line(line: &str) -> Option<MapPick> {
    let (order, rest) = line.split_once(". ")?;
    let order = order.trim().parse().ok()?;

    if let Some(map_name) = rest.strip_suffix(" was left over") {
        return Some(MapPick { order, team_name: None, map_name: map_name.trim().to_string(), action: PickAction::LeftOver });
    }

    let (team, action, map_name) = if let Some((team, map)) = rest.rsplit_once(" picked ") {
        (team, PickAction::Picked, map)
    } else {
        let (team, map) = rest.rsplit_once(" removed ")?;
        (team, PickAction::Removed, map)
    };

    Some(MapPick {
        order,
        team_name: Some(team.trim().to_string()),
        map_name: map_name.trim().to_string(),
        action,
    })
}
