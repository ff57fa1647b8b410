/// A tracked game from the registry table.
///
/// Most columns belong to the CRUD front end; the engine reads identity,
/// `steam_app_id`, and `hours_played`, and writes `hours_played` back.
#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub id: i64,
    pub title: String,
    pub platform: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub rating: Option<i64>,
    pub hours_played: Option<f64>,
    pub steam_app_id: Option<i64>,
    pub cover_url: Option<String>,
    pub completion_date: Option<String>,
}

impl Game {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: title.into(),
            platform: None,
            status: None,
            notes: None,
            rating: None,
            hours_played: None,
            steam_app_id: None,
            cover_url: None,
            completion_date: None,
        }
    }

    pub fn with_steam_app_id(mut self, app_id: i64) -> Self {
        self.steam_app_id = Some(app_id);
        self
    }

    pub fn with_hours(mut self, hours: f64) -> Self {
        self.hours_played = Some(hours);
        self
    }

    pub fn with_cover(mut self, cover_url: impl Into<String>) -> Self {
        self.cover_url = Some(cover_url.into());
        self
    }
}

/// A per-game achievement row, overwritten wholesale when the recorder's
/// enrichment step re-fetches unlock detail for a game played that day.
#[derive(Debug, Clone, PartialEq)]
pub struct Achievement {
    pub id: i64,
    pub game_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub date: Option<String>,
    pub unlocked: bool,
    pub icon_url: Option<String>,
}
