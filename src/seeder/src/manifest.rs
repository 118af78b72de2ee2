//! On-disk seed manifest: the JSON shape plus its conversion into the
//! `db::seed` graph. Image payloads are referenced as files relative to the
//! manifest, or inlined as base64.

use db::schema::{DescriptionFields, DifficultyLevel, ImageFields, Role};
use db::seed;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub users: Vec<ManifestUser>,
}

#[derive(Deserialize)]
pub struct ManifestUser {
    #[serde(default)]
    pub full_name: Option<String>,
    pub nickname: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
    #[serde(default)]
    pub about: Option<String>,
    pub role: String,
    #[serde(default)]
    pub profile_image: Option<ManifestImage>,
    #[serde(default)]
    pub tasks: Vec<ManifestTask>,
}

#[derive(Deserialize)]
pub struct ManifestTask {
    pub name: String,
    pub difficulty_level: String,
    #[serde(default)]
    pub description: Option<ManifestDescription>,
    #[serde(default)]
    pub hints: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub solutions: Vec<ManifestSolution>,
    #[serde(default)]
    pub votes: Vec<ManifestVote>,
    #[serde(default)]
    pub test_data: Option<ManifestTestData>,
}

#[derive(Deserialize)]
pub struct ManifestDescription {
    pub text: String,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub images: Vec<ManifestImage>,
}

#[derive(Deserialize)]
pub struct ManifestSolution {
    pub name: String,
    pub author: String,
    pub content: String,
    #[serde(default)]
    pub description: Option<ManifestDescription>,
    #[serde(default)]
    pub votes: Vec<ManifestVote>,
}

#[derive(Deserialize)]
pub struct ManifestVote {
    pub user: String,
    pub stars_count: i16,
}

#[derive(Deserialize)]
pub struct ManifestTestData {
    #[serde(default)]
    pub cases: Vec<ManifestTestCase>,
}

#[derive(Deserialize)]
pub struct ManifestTestCase {
    #[serde(default)]
    pub arguments: Option<String>,
    #[serde(default)]
    pub expected_result: Option<String>,
}

#[derive(Deserialize)]
pub struct ManifestImage {
    pub name: String,
    /// Path relative to the manifest file.
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Base64 payload, used when no file is given.
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("failed to read {filename}: {source}")]
    ReadFile {
        filename: String,
        #[source]
        source: std::io::Error,
    },
    #[error("image {0}: invalid base64 content")]
    Base64(String),
    #[error("image {0}: either `file` or `content` is required")]
    MissingImageContent(String),
    #[error("unknown role: {0}")]
    Role(String),
    #[error("unknown difficulty level: {0}")]
    DifficultyLevel(String),
}

fn image(image: ManifestImage, base_dir: &Path) -> Result<ImageFields, ParseError> {
    let content = match (&image.file, &image.content) {
        (Some(file), _) => {
            let path = base_dir.join(file);
            std::fs::read(&path).map_err(|source| ParseError::ReadFile {
                filename: path.display().to_string(),
                source,
            })?
        }
        (None, Some(encoded)) => {
            base64::decode(encoded).map_err(|_| ParseError::Base64(image.name.clone()))?
        }
        (None, None) => return Err(ParseError::MissingImageContent(image.name)),
    };
    Ok(ImageFields {
        name: image.name,
        content,
    })
}

fn description(
    description: ManifestDescription,
    base_dir: &Path,
) -> Result<seed::SeedDescription, ParseError> {
    let images = description
        .images
        .into_iter()
        .map(|img| image(img, base_dir))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(seed::SeedDescription {
        fields: DescriptionFields {
            text: description.text,
            links: description.links,
        },
        images,
    })
}

fn vote(vote: ManifestVote) -> seed::SeedVote {
    seed::SeedVote {
        user: vote.user,
        stars_count: vote.stars_count,
    }
}

pub fn into_graph(manifest: Manifest, base_dir: &Path) -> Result<seed::SeedGraph, ParseError> {
    let mut users = Vec::new();
    for user in manifest.users {
        let role: Role = user
            .role
            .parse()
            .map_err(|_| ParseError::Role(user.role.clone()))?;
        let profile_image = match user.profile_image {
            Some(img) => Some(image(img, base_dir)?),
            None => None,
        };
        let mut tasks = Vec::new();
        for task in user.tasks {
            let difficulty_level: DifficultyLevel = task
                .difficulty_level
                .parse()
                .map_err(|_| ParseError::DifficultyLevel(task.difficulty_level.clone()))?;
            let task_description = match task.description {
                Some(d) => Some(description(d, base_dir)?),
                None => None,
            };
            let mut solutions = Vec::new();
            for solution in task.solutions {
                let solution_description = match solution.description {
                    Some(d) => Some(description(d, base_dir)?),
                    None => None,
                };
                solutions.push(seed::SeedSolution {
                    name: solution.name,
                    author: solution.author,
                    content: solution.content,
                    description: solution_description,
                    votes: solution.votes.into_iter().map(vote).collect(),
                });
            }
            tasks.push(seed::SeedTask {
                name: task.name,
                difficulty_level,
                description: task_description,
                hints: task.hints,
                tags: task.tags,
                solutions,
                votes: task.votes.into_iter().map(vote).collect(),
                test_data: task.test_data.map(|data| seed::SeedTestData {
                    cases: data
                        .cases
                        .into_iter()
                        .map(|case| seed::SeedTestCase {
                            arguments: case.arguments,
                            expected_result: case.expected_result,
                        })
                        .collect(),
                }),
            });
        }
        users.push(seed::SeedUser {
            full_name: user.full_name,
            nickname: user.nickname,
            email: user.email,
            password: user.password,
            about: user.about,
            role,
            profile_image,
            tasks,
        });
    }
    Ok(seed::SeedGraph {
        users,
        tags: manifest.tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let raw = r#"{
            "tags": ["Math operations"],
            "users": [{
                "nickname": "Djangolo",
                "password": "pw",
                "role": "USER",
                "profile_image": {"name": "avatar", "content": "AQID"},
                "tasks": [{
                    "name": "Addition",
                    "difficulty_level": "EASY",
                    "hints": 1,
                    "tags": ["Math operations"],
                    "votes": [{"user": "Djangolo", "stars_count": 4}]
                }]
            }]
        }"#;
        let manifest: Manifest = serde_json::from_str(raw).unwrap();
        let graph = into_graph(manifest, Path::new(".")).unwrap();
        assert_eq!(graph.users.len(), 1);
        assert_eq!(graph.users[0].tasks[0].hints, 1);
        assert_eq!(
            graph.users[0].profile_image.as_ref().unwrap().content,
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_bad_role_rejected() {
        let raw = r#"{"users": [{"nickname": "x", "password": "pw", "role": "WIZARD"}]}"#;
        let manifest: Manifest = serde_json::from_str(raw).unwrap();
        match into_graph(manifest, Path::new(".")) {
            Err(ParseError::Role(role)) => assert_eq!(role, "WIZARD"),
            other => panic!("expected role error, got {:?}", other.is_ok()),
        }
    }
}
