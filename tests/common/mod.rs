#![allow(dead_code)]

use std::sync::Arc;

use fieldset::{AttrConfig, ArraySpec, Schema};
use serde_json::{json, Map, Value};

/// `{matchId: int required, pts: int default 0}`
pub fn score_schema() -> Arc<Schema> {
    Schema::builder("Score")
        .scalar("matchId", AttrConfig::<i64>::new().minimum(0))
        .scalar("pts", AttrConfig::<i64>::new().with_default(0))
        .build()
        .unwrap()
}

/// `{ratio: float in [0, 10], weight: optional float}`
pub fn ratio_schema() -> Arc<Schema> {
    Schema::builder("Ratio")
        .scalar("ratio", AttrConfig::<f64>::new().minimum(0.0).maximum(10.0))
        .scalar("weight", AttrConfig::<f64>::new().optional().choices([0.5, 1.0, 2.0]))
        .build()
        .unwrap()
}

pub fn player_schema() -> Arc<Schema> {
    Schema::builder("Player")
        .scalar("playerId", AttrConfig::<i64>::new())
        .scalar("name", AttrConfig::<String>::new().max_length(30))
        .scalar(
            "position",
            AttrConfig::<String>::new()
                .optional()
                .choices(["keeper", "defender", "midfielder", "forward"].map(String::from)),
        )
        .build()
        .unwrap()
}

pub fn team_schema() -> Arc<Schema> {
    Schema::builder("Team")
        .scalar("teamName", AttrConfig::<String>::new())
        .scalar("founded", AttrConfig::<i64>::new().optional().minimum(1850))
        .build()
        .unwrap()
}

pub fn match_schema() -> Arc<Schema> {
    Schema::builder("Match")
        .scalar("matchId", AttrConfig::<i64>::new().minimum(1))
        .scalar("attendance", AttrConfig::<i64>::new().optional().minimum(0).maximum(100_000))
        .scalar("neutral", AttrConfig::<bool>::new().with_default(false))
        .scalar("kickoff", AttrConfig::<chrono::NaiveDate>::new().optional())
        .scalar_array("tags", ArraySpec::new(AttrConfig::<String>::new().into()))
        .model("homeTeam", team_schema(), false)
        .model("awayTeam", team_schema(), false)
        .models("players", ArraySpec::new(player_schema()).max_length(22))
        .build()
        .unwrap()
}

/// Every field of [`match_schema`] present and valid.
pub fn full_match_record() -> Value {
    json!({
        "match_id": 12,
        "attendance": 41000,
        "neutral": false,
        "kickoff": "2024-05-18",
        "tags": ["league", "derby"],
        "home_team": { "team_name": "Owls", "founded": 1867 },
        "away_team": { "team_name": "Blades", "founded": 1889 },
        "players": [
            { "player_id": 1, "name": "Ada", "position": "keeper" },
            { "player_id": 9, "name": "Bo", "position": "forward" }
        ]
    })
}

pub fn object(value: &Value) -> &Map<String, Value> {
    value.as_object().unwrap()
}
