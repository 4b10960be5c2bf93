use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Default)]
pub struct WsQuery {
    #[serde(rename = "playerName")]
    pub player_name: Option<String>, // only players include player_name
    #[serde(rename = "playerId")]
    pub player_id: Option<String>, // only reconnecting players include player_id
    pub host_token: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RoomParams {
    pub code: String,
}

#[derive(Deserialize, Debug)]
pub struct HostQuery {
    pub host_token: String,
}
