use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct ContractQuest {
    pub setup: Setup,
    pub global: Option<Global>,
    pub run: Option<Run>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Setup {
    pub base_url: String,
    pub timeout_secs: Option<u64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Global {
    pub headers: Option<toml::Value>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Run {
    pub scenarios: Option<Vec<String>>,
}
