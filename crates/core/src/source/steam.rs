use std::collections::HashMap;

use chrono::DateTime;
use serde::Deserialize;
use tracing::debug;

use crate::config::TrackerConfig;
use crate::source::{PlaytimeSource, RateLimiter, SourceAchievement, SourceError};

const OWNED_GAMES_URL: &str =
    "https://api.steampowered.com/IPlayerService/GetOwnedGames/v0001/";
const SCHEMA_URL: &str = "https://api.steampowered.com/ISteamUserStats/GetSchemaForGame/v2/";
const PLAYER_ACHIEVEMENTS_URL: &str =
    "https://api.steampowered.com/ISteamUserStats/GetPlayerAchievements/v0001/";

/// Steam Web API client. One batched `GetOwnedGames` call covers the whole
/// library; achievement detail merges the game schema with the player's
/// unlock state, as two further calls.
pub struct SteamClient {
    http: reqwest::blocking::Client,
    api_key: String,
    user_id: String,
    rate_limiter: RateLimiter,
}

impl SteamClient {
    pub fn new(config: &TrackerConfig) -> Result<Self, SourceError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.source_timeout)
            .build()
            .map_err(|e| SourceError::Unavailable(format!("http client init: {e}")))?;

        Ok(Self {
            http,
            api_key: config.steam_api_key.clone(),
            user_id: config.steam_user_id.clone(),
            rate_limiter: RateLimiter::new(config.source_min_interval),
        })
    }

    fn check_credentials(&self) -> Result<(), SourceError> {
        if self.api_key.is_empty() || self.user_id.is_empty() {
            return Err(SourceError::Misconfigured(
                "STEAM_API_KEY and STEAM_USER_ID must be set".into(),
            ));
        }
        Ok(())
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        self.rate_limiter.wait();

        let response = self.http.get(url).query(query).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!(
                "{url} returned status {status}"
            )));
        }

        Ok(response.json()?)
    }
}

impl PlaytimeSource for SteamClient {
    fn fetch_library_playtime(&self) -> Result<HashMap<i64, u32>, SourceError> {
        self.check_credentials()?;

        let envelope: OwnedGamesEnvelope = self.get_json(
            OWNED_GAMES_URL,
            &[
                ("key", self.api_key.as_str()),
                ("steamid", self.user_id.as_str()),
                ("include_appinfo", "1"),
                ("include_played_free_games", "1"),
            ],
        )?;

        let games = envelope.response.unwrap_or_default().games;
        debug!(count = games.len(), "fetched owned games");

        Ok(games
            .into_iter()
            .map(|game| (game.appid, game.playtime_forever))
            .collect())
    }

    fn fetch_achievements(&self, app_id: i64) -> Result<Vec<SourceAchievement>, SourceError> {
        self.check_credentials()?;
        let app_id_str = app_id.to_string();

        let schema: SchemaEnvelope = self.get_json(
            SCHEMA_URL,
            &[("key", self.api_key.as_str()), ("appid", app_id_str.as_str())],
        )?;

        let schema_achievements = schema
            .game
            .and_then(|g| g.available_game_stats)
            .map(|s| s.achievements)
            .unwrap_or_default();

        if schema_achievements.is_empty() {
            return Ok(Vec::new());
        }

        // Unlock state is best-effort: a private profile or a flaky call
        // degrades to "nothing unlocked" instead of failing the game.
        let unlocks: HashMap<String, (bool, i64)> = match self.get_json::<PlayerEnvelope>(
            PLAYER_ACHIEVEMENTS_URL,
            &[
                ("appid", app_id_str.as_str()),
                ("key", self.api_key.as_str()),
                ("steamid", self.user_id.as_str()),
            ],
        ) {
            Ok(envelope) => {
                let stats = envelope.playerstats.unwrap_or_default();
                if stats.success {
                    stats
                        .achievements
                        .into_iter()
                        .map(|a| (a.apiname, (a.achieved != 0, a.unlocktime)))
                        .collect()
                } else {
                    HashMap::new()
                }
            }
            Err(e) => {
                debug!(app_id, error = %e, "player achievement fetch failed");
                HashMap::new()
            }
        };

        Ok(schema_achievements
            .into_iter()
            .map(|schema_ach| {
                let (unlocked, unlocktime) =
                    unlocks.get(&schema_ach.name).copied().unwrap_or((false, 0));
                SourceAchievement {
                    title: schema_ach.display_name.unwrap_or_else(|| schema_ach.name.clone()),
                    description: schema_ach.description,
                    icon_url: schema_ach.icon,
                    unlocked,
                    unlock_date: (unlocktime > 0)
                        .then(|| DateTime::from_timestamp(unlocktime, 0))
                        .flatten()
                        .map(|dt| dt.format("%Y-%m-%d").to_string()),
                }
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct OwnedGamesEnvelope {
    response: Option<OwnedGamesResponse>,
}

#[derive(Debug, Deserialize, Default)]
struct OwnedGamesResponse {
    #[serde(default)]
    games: Vec<OwnedGame>,
}

#[derive(Debug, Deserialize)]
struct OwnedGame {
    appid: i64,
    #[serde(default)]
    playtime_forever: u32,
}

#[derive(Debug, Deserialize)]
struct SchemaEnvelope {
    game: Option<SchemaGame>,
}

#[derive(Debug, Deserialize)]
struct SchemaGame {
    #[serde(rename = "availableGameStats")]
    available_game_stats: Option<SchemaStats>,
}

#[derive(Debug, Deserialize)]
struct SchemaStats {
    #[serde(default)]
    achievements: Vec<SchemaAchievement>,
}

#[derive(Debug, Deserialize)]
struct SchemaAchievement {
    name: String,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    description: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlayerEnvelope {
    playerstats: Option<PlayerStats>,
}

#[derive(Debug, Deserialize, Default)]
struct PlayerStats {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    achievements: Vec<PlayerAchievement>,
}

#[derive(Debug, Deserialize)]
struct PlayerAchievement {
    apiname: String,
    #[serde(default)]
    achieved: i64,
    #[serde(default)]
    unlocktime: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_games_payload_parses() {
        let payload = r#"{
            "response": {
                "game_count": 2,
                "games": [
                    {"appid": 1145360, "name": "Hades", "playtime_forever": 750},
                    {"appid": 504230, "playtime_forever": 0}
                ]
            }
        }"#;

        let envelope: OwnedGamesEnvelope = serde_json::from_str(payload).unwrap();
        let games = envelope.response.unwrap().games;
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].appid, 1145360);
        assert_eq!(games[0].playtime_forever, 750);
    }

    #[test]
    fn test_empty_response_tolerated() {
        let envelope: OwnedGamesEnvelope = serde_json::from_str(r#"{"response": {}}"#).unwrap();
        assert!(envelope.response.unwrap().games.is_empty());
    }

    #[test]
    fn test_schema_and_player_payloads_parse() {
        let schema: SchemaEnvelope = serde_json::from_str(
            r#"{
                "game": {
                    "gameName": "Hades",
                    "availableGameStats": {
                        "achievements": [
                            {"name": "ACH_ESCAPE", "displayName": "Escaped",
                             "description": "Reach the surface", "icon": "https://x/icon.jpg"}
                        ]
                    }
                }
            }"#,
        )
        .unwrap();
        let achievements = schema
            .game
            .unwrap()
            .available_game_stats
            .unwrap()
            .achievements;
        assert_eq!(achievements[0].name, "ACH_ESCAPE");

        let player: PlayerEnvelope = serde_json::from_str(
            r#"{
                "playerstats": {
                    "success": true,
                    "achievements": [
                        {"apiname": "ACH_ESCAPE", "achieved": 1, "unlocktime": 1767225600}
                    ]
                }
            }"#,
        )
        .unwrap();
        let stats = player.playerstats.unwrap();
        assert!(stats.success);
        assert_eq!(stats.achievements[0].achieved, 1);
    }

    #[test]
    fn test_misconfigured_without_credentials() {
        let client = SteamClient::new(&TrackerConfig::default()).unwrap();

        let err = client.fetch_library_playtime().unwrap_err();
        assert!(matches!(err, SourceError::Misconfigured(_)));
        assert!(!err.is_retryable());
    }
}
