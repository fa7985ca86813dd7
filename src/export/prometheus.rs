//! Prometheus text exposition of library statistics.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::io::Write;

use chrono::{DateTime, Utc};

use crate::data::{Game, GameStatus};

/// User ratings GameTrack allows
const RATINGS: std::ops::RangeInclusive<i64> = 1..=10;

/// One labelled value of a gauge
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: Vec<(&'static str, String)>,
    pub value: f64,
}

impl Sample {
    fn unlabelled(value: f64) -> Self {
        Sample {
            labels: Vec::new(),
            value,
        }
    }
}

/// A named gauge with its samples
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: &'static str,
    pub help: &'static str,
    pub samples: Vec<Sample>,
}

/// Everything written to the metrics file for one run
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub families: Vec<MetricFamily>,
}

impl MetricsSnapshot {
    pub fn from_games(games: &[Game], generated_at: DateTime<Utc>) -> Self {
        let years: BTreeSet<i32> = games.iter().map(|g| g.release_year).collect();
        let platforms: BTreeSet<&str> = games.iter().map(|g| g.owned_platform.as_str()).collect();

        let mut counts: HashMap<(i32, &str, GameStatus), u64> = HashMap::new();
        let mut ratings: HashMap<(i32, i64), u64> = HashMap::new();
        for game in games {
            *counts
                .entry((game.release_year, game.owned_platform.as_str(), game.status))
                .or_default() += 1;
            if RATINGS.contains(&game.user_rating) {
                *ratings.entry((game.release_year, game.user_rating)).or_default() += 1;
            }
        }

        // Zero-filled over every combination so series don't vanish between runs
        let mut count_samples = Vec::new();
        for status in GameStatus::ALL {
            for &year in &years {
                for &platform in &platforms {
                    let value = counts.get(&(year, platform, status)).copied().unwrap_or(0);
                    count_samples.push(Sample {
                        labels: vec![
                            ("year", year.to_string()),
                            ("platform", platform.to_string()),
                            ("status", status.to_string()),
                        ],
                        value: value as f64,
                    });
                }
            }
        }

        let mut rating_samples = Vec::new();
        for &year in &years {
            for rating in RATINGS {
                let value = ratings.get(&(year, rating)).copied().unwrap_or(0);
                rating_samples.push(Sample {
                    labels: vec![("year", year.to_string()), ("rating", rating.to_string())],
                    value: value as f64,
                });
            }
        }

        MetricsSnapshot {
            families: vec![
                MetricFamily {
                    name: "gametrack_game_count",
                    help: "Number of games",
                    samples: count_samples,
                },
                MetricFamily {
                    name: "gametrack_game_rating",
                    help: "Game rating",
                    samples: rating_samples,
                },
                MetricFamily {
                    name: "gametrack_games_total",
                    help: "Number of games in the library",
                    samples: vec![Sample::unlabelled(games.len() as f64)],
                },
                MetricFamily {
                    name: "gametrack_last_export_timestamp_seconds",
                    help: "Unix time of the export",
                    samples: vec![Sample::unlabelled(generated_at.timestamp() as f64)],
                },
            ],
        }
    }

    pub fn sample_count(&self) -> usize {
        self.families.iter().map(|f| f.samples.len()).sum()
    }

    /// Render in the text exposition format
    pub fn render(&self) -> String {
        let mut out = String::new();
        for family in &self.families {
            let _ = writeln!(out, "# HELP {} {}", family.name, family.help);
            let _ = writeln!(out, "# TYPE {} gauge", family.name);
            for sample in &family.samples {
                out.push_str(family.name);
                if !sample.labels.is_empty() {
                    let labels: Vec<String> = sample
                        .labels
                        .iter()
                        .map(|(k, v)| format!("{k}=\"{}\"", escape_label(v)))
                        .collect();
                    let _ = write!(out, "{{{}}}", labels.join(","));
                }
                let _ = writeln!(out, " {:.1}", sample.value);
            }
        }
        out
    }
}

/// Write the snapshot. Returns the number of sample lines.
pub fn write_metrics<W: Write>(mut writer: W, snapshot: &MetricsSnapshot) -> std::io::Result<usize> {
    writer.write_all(snapshot.render().as_bytes())?;
    writer.flush()?;
    Ok(snapshot.sample_count())
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn game(year: i32, platform: &str, status: GameStatus, rating: i64) -> Game {
        Game {
            release_year: year,
            owned_platform: platform.to_string(),
            status,
            user_rating: rating,
            ..Game::default()
        }
    }

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }

    fn sample_lines(rendered: &str) -> Vec<&str> {
        rendered.lines().filter(|l| !l.starts_with('#')).collect()
    }

    #[test]
    fn test_one_line_per_sample() {
        let games = vec![
            game(2015, "PC", GameStatus::Completed, 9),
            game(2020, "Switch", GameStatus::InProgress, 0),
            game(2020, "PC", GameStatus::Completed, 7),
        ];
        let snapshot = MetricsSnapshot::from_games(&games, generated_at());

        // 6 statuses x 2 years x 2 platforms, 2 years x 10 ratings, 2 scalars
        assert_eq!(snapshot.sample_count(), 24 + 20 + 2);

        let mut buf = Vec::new();
        let written = write_metrics(&mut buf, &snapshot).unwrap();
        let rendered = String::from_utf8(buf).unwrap();
        assert_eq!(written, snapshot.sample_count());
        assert_eq!(sample_lines(&rendered).len(), written);
        assert!(rendered.ends_with('\n'));
    }

    #[test]
    fn test_counts_and_ratings() {
        let games = vec![
            game(2015, "PC", GameStatus::Completed, 9),
            game(2015, "PC", GameStatus::Completed, 9),
            game(2020, "Switch", GameStatus::InProgress, 0),
        ];
        let rendered = MetricsSnapshot::from_games(&games, generated_at()).render();

        assert!(rendered.contains(
            "gametrack_game_count{year=\"2015\",platform=\"PC\",status=\"Completed\"} 2.0\n"
        ));
        assert!(rendered.contains(
            "gametrack_game_count{year=\"2020\",platform=\"Switch\",status=\"In Progress\"} 1.0\n"
        ));
        assert!(rendered.contains(
            "gametrack_game_count{year=\"2015\",platform=\"Switch\",status=\"Wanted\"} 0.0\n"
        ));
        assert!(rendered.contains("gametrack_game_rating{year=\"2015\",rating=\"9\"} 2.0\n"));
        assert!(rendered.contains("gametrack_game_rating{year=\"2020\",rating=\"1\"} 0.0\n"));
        assert!(rendered.contains("gametrack_games_total 3.0\n"));
        assert!(rendered.contains("gametrack_last_export_timestamp_seconds 1735787045.0\n"));
    }

    #[test]
    fn test_sample_order() {
        let games = vec![
            game(2020, "Switch", GameStatus::Queued, 3),
            game(2015, "PC", GameStatus::Queued, 5),
        ];
        let rendered = MetricsSnapshot::from_games(&games, generated_at()).render();
        let lines = sample_lines(&rendered);

        // Status-major, then ascending year, then ascending platform
        assert!(lines[0].starts_with(
            "gametrack_game_count{year=\"2015\",platform=\"PC\",status=\"In Progress\"}"
        ));
        assert!(lines[1].starts_with(
            "gametrack_game_count{year=\"2015\",platform=\"Switch\",status=\"In Progress\"}"
        ));
        assert!(lines[2].starts_with(
            "gametrack_game_count{year=\"2020\",platform=\"PC\",status=\"In Progress\"}"
        ));
        // Ratings are year-major
        assert!(lines[24].starts_with("gametrack_game_rating{year=\"2015\",rating=\"1\"}"));
        assert!(lines[34].starts_with("gametrack_game_rating{year=\"2020\",rating=\"1\"}"));
    }

    #[test]
    fn test_help_and_type_headers() {
        let rendered = MetricsSnapshot::from_games(&[], generated_at()).render();
        assert!(rendered.starts_with(
            "# HELP gametrack_game_count Number of games\n# TYPE gametrack_game_count gauge\n"
        ));
        assert!(rendered.contains("# TYPE gametrack_game_rating gauge\n"));
    }

    #[test]
    fn test_empty_library() {
        let snapshot = MetricsSnapshot::from_games(&[], generated_at());
        assert_eq!(snapshot.sample_count(), 2);
        assert!(snapshot.render().contains("gametrack_games_total 0.0\n"));
    }

    #[test]
    fn test_out_of_range_rating_not_counted() {
        let games = vec![game(2015, "PC", GameStatus::Completed, 11)];
        let rendered = MetricsSnapshot::from_games(&games, generated_at()).render();
        assert!(!rendered.contains("rating=\"11\""));
        assert!(!sample_lines(&rendered)
            .iter()
            .any(|l| l.starts_with("gametrack_game_rating") && l.ends_with(" 1.0")));
    }

    #[test]
    fn test_label_escaping() {
        assert_eq!(escape_label(r#"Quest "2""#), r#"Quest \"2\""#);
        assert_eq!(escape_label("a\\b\nc"), "a\\\\b\\nc");
    }
}
