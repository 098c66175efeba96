pub mod chart;

use std::fs;
use std::path::{Path, PathBuf};

use blackjack_arena::{
    ArenaError, Competitor, HistoryReporter, Rule, Standings, StrategyKind, Tournament,
    TournamentConfig,
};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("cannot serialize export: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown strategy {strategy:?} for competitor {competitor}")]
    UnknownStrategy {
        competitor: String,
        strategy: String,
    },
    #[error("cannot find the home directory")]
    NoHomeDirectory,
    #[error(transparent)]
    Arena(#[from] ArenaError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rule: ConfigRule,
    pub tournament: ConfigTournament,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigRule {
    pub number_of_decks: u8,
    pub dealer_hit_on_soft17: bool,
    pub allow_double_down: bool,

    pub payout_blackjack: f64,
}

impl Default for ConfigRule {
    fn default() -> Self {
        let rule = Rule::default();
        ConfigRule {
            number_of_decks: rule.number_of_decks,
            dealer_hit_on_soft17: rule.dealer_hit_on_soft17,
            allow_double_down: rule.allow_double_down,
            payout_blackjack: rule.payout_blackjack,
        }
    }
}

impl TryFrom<ConfigRule> for Rule {
    type Error = ArenaError;

    fn try_from(config_rule: ConfigRule) -> Result<Rule, Self::Error> {
        let rule = Rule {
            number_of_decks: config_rule.number_of_decks,
            dealer_hit_on_soft17: config_rule.dealer_hit_on_soft17,
            allow_double_down: config_rule.allow_double_down,
            payout_blackjack: config_rule.payout_blackjack,
        };
        rule.validate()?;
        Ok(rule)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigTournament {
    pub hands: u32,
    pub bet: u32,
    pub starting_balance: f64,
    pub seed: Option<u64>,
    /// Redraw the chart every this many hands.
    pub refresh_every: u32,
    pub competitors: Vec<ConfigCompetitor>,
}

impl Default for ConfigTournament {
    fn default() -> Self {
        let defaults = TournamentConfig::default();
        ConfigTournament {
            hands: defaults.hands,
            bet: defaults.bet,
            starting_balance: defaults.starting_balance,
            seed: defaults.seed,
            refresh_every: 100,
            competitors: default_roster(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigCompetitor {
    pub name: String,
    pub strategy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<u16>,
}

/// One competitor per built-in strategy, named after it.
fn default_roster() -> Vec<ConfigCompetitor> {
    StrategyKind::iter()
        .map(|kind| ConfigCompetitor {
            name: format!("{:?}", kind),
            strategy: format!("{:?}", kind),
            param: None,
        })
        .collect()
}

impl Config {
    pub fn tournament_config(&self) -> Result<TournamentConfig, DriverError> {
        let config = TournamentConfig {
            rule: self.rule.clone().try_into()?,
            hands: self.tournament.hands,
            bet: self.tournament.bet,
            starting_balance: self.tournament.starting_balance,
            seed: self.tournament.seed,
        };
        config.validate()?;
        Ok(config)
    }

    /// Looks up every configured strategy by name and builds a fresh bot for
    /// it.
    pub fn build_competitors(&self, rule: &Rule) -> Result<Vec<Competitor>, DriverError> {
        self.tournament
            .competitors
            .iter()
            .map(|competitor| {
                let kind: StrategyKind = competitor.strategy.parse().map_err(|_| {
                    DriverError::UnknownStrategy {
                        competitor: competitor.name.clone(),
                        strategy: competitor.strategy.clone(),
                    }
                })?;
                let strategy = kind.build(competitor.param, rule)?;
                Ok(Competitor::new(competitor.name.clone(), strategy))
            })
            .collect()
    }

    pub fn build_tournament(&self) -> Result<Tournament, DriverError> {
        let config = self.tournament_config()?;
        let competitors = self.build_competitors(&config.rule)?;
        Ok(Tournament::new(config, competitors)?)
    }
}

pub fn parse_config(content: &str) -> Result<Config, DriverError> {
    Ok(serde_yaml::from_str(content)?)
}

/// Reads the content of a given config file and parses it to a Config.
pub fn parse_config_from_file(path: &Path) -> Result<Config, DriverError> {
    let content = fs::read_to_string(path).map_err(|source| DriverError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

#[derive(Debug, Serialize)]
struct Export<'a> {
    standings: &'a Standings,
    history: &'a HistoryReporter,
}

pub fn export_to_json(
    history: &HistoryReporter,
    standings: &Standings,
) -> Result<String, DriverError> {
    Ok(serde_json::to_string_pretty(&Export { standings, history })?)
}

/// Writes the balance history and the final standings to `path` as JSON.
pub fn export_to_file(
    path: &Path,
    history: &HistoryReporter,
    standings: &Standings,
) -> Result<(), DriverError> {
    let json = export_to_json(history, standings)?;
    fs::write(path, json).map_err(|source| DriverError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Plain text table of the final standings, best first.
pub fn format_standings(standings: &Standings) -> String {
    let name_width = standings
        .entries()
        .iter()
        .map(|standing| standing.name.len())
        .max()
        .unwrap_or(0)
        .max(4);

    let mut out = format!(
        "{:<4} {:<name_width$} {:>9} {:>6} {:>6} {:>6} {:>6} {:>4} {:>8}\n",
        "#", "Name", "Balance", "Hands", "Won", "Lost", "Push", "BJ", "Forfeit",
    );
    for (rank, standing) in standings.entries().iter().enumerate() {
        out.push_str(&format!(
            "{:<4} {:<name_width$} {:>9} {:>6} {:>6} {:>6} {:>6} {:>4} {:>8}{}\n",
            rank + 1,
            standing.name,
            standing.balance,
            standing.hands_played,
            standing.wins,
            standing.losses,
            standing.pushes,
            standing.blackjacks,
            standing.forfeits,
            if standing.eliminated {
                format!("  broke after hand {}", standing.last_hand)
            } else {
                String::new()
            },
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CONFIG: &str = include_str!("../arena.yml");

    fn get_typical_config_rule() -> ConfigRule {
        ConfigRule {
            number_of_decks: 6,
            dealer_hit_on_soft17: false,
            allow_double_down: true,
            payout_blackjack: 1.2,
        }
    }

    #[test]
    fn can_convert_rule() {
        let config_rule = get_typical_config_rule();
        let converted_rule: Rule = config_rule.try_into().unwrap();
        assert_eq!(converted_rule.number_of_decks, 6);
        assert!(!converted_rule.dealer_hit_on_soft17);
        assert_eq!(converted_rule.payout_blackjack, 1.2);
    }

    #[test]
    fn should_return_error_when_converting_rule() {
        let mut config_rule = get_typical_config_rule();
        config_rule.number_of_decks = 0;
        let convert_result: Result<Rule, ArenaError> = config_rule.try_into();
        assert!(convert_result.is_err());
    }

    #[test]
    fn sample_config_builds_a_tournament() {
        let config = parse_config(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.tournament.competitors.len(), 5);
        let tournament_config = config.tournament_config().unwrap();
        assert_eq!(tournament_config.seed, Some(2024));
        assert!(config.build_tournament().is_ok());
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = parse_config("tournament:\n  hands: 50\n").unwrap();
        assert_eq!(config.tournament.hands, 50);
        assert_eq!(config.tournament.bet, 10);
        assert_eq!(config.rule.number_of_decks, 1);
        assert_eq!(config.tournament.competitors, default_roster());
        assert!(config.build_tournament().is_ok());
    }

    #[test]
    fn default_roster_has_every_strategy() {
        let roster = default_roster();
        assert_eq!(roster.len(), StrategyKind::iter().count());
        assert!(Config::default().build_tournament().is_ok());
    }

    #[test]
    fn unknown_strategy_is_reported() {
        let yaml = "tournament:\n  competitors:\n    - name: lucky\n      strategy: Martingale\n";
        let config = parse_config(yaml).unwrap();
        let error = config.build_tournament().err().unwrap();
        assert!(matches!(
            error,
            DriverError::UnknownStrategy { ref competitor, .. } if competitor == "lucky"
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let yaml = "tournament:\n  hands: 0\n";
        let error = parse_config(yaml).unwrap().build_tournament().err().unwrap();
        assert!(matches!(error, DriverError::Arena(ArenaError::InvalidConfig(_))));

        let yaml = "tournament:\n  competitors: []\n";
        assert!(parse_config(yaml).unwrap().build_tournament().is_err());

        let yaml = "tournament:\n  competitors:\n    - name: a\n      strategy: HitBelow\n      param: 40\n";
        assert!(parse_config(yaml).unwrap().build_tournament().is_err());

        assert!(matches!(
            parse_config("rule: [1, 2]"),
            Err(DriverError::Yaml(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = parse_config_from_file(Path::new("/definitely/not/here.yml"));
        assert!(matches!(result, Err(DriverError::Io { .. })));
    }

    #[test]
    fn export_contains_history_and_standings() {
        let mut config = parse_config(SAMPLE_CONFIG).unwrap();
        config.tournament.hands = 5;
        let mut history = HistoryReporter::new();
        let standings = config.build_tournament().unwrap().run(&mut history).unwrap();

        let json = export_to_json(&history, &standings).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["standings"]["entries"].as_array().unwrap().len(), 5);
        let series = value["history"]["series"].as_array().unwrap();
        assert_eq!(series.len(), 5);
        assert_eq!(series[0]["points"][0]["hand_index"], 0);
        assert_eq!(series[0]["points"][0]["balance"], 1000.0);
    }

    #[test]
    fn standings_table_lists_everyone() {
        let mut config = Config::default();
        config.tournament.hands = 10;
        config.tournament.seed = Some(1);
        let standings = config.build_tournament().unwrap().run(&mut ()).unwrap();
        let table = format_standings(&standings);
        assert_eq!(table.lines().count(), standings.len() + 1);
        for standing in standings.entries() {
            assert!(table.contains(&standing.name));
        }
        assert!(table.lines().nth(1).unwrap().starts_with("1 "));
    }
}
