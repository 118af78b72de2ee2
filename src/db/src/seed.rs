//! Bootstrap data loading.
//!
//! A [`SeedGraph`] describes one nested entity graph, keyed by user
//! nickname and tag text instead of ids. [`apply`] inserts it in dependency
//! order through the same operations (and therefore the same validation and
//! referential checks) as any other write. An already-populated store is a
//! no-op, so running the loader twice cannot create duplicates.

use crate::{
    error::{Error, Result},
    schema::*,
    DbConn,
};
use std::collections::HashMap;

#[derive(Default)]
pub struct SeedGraph {
    pub users: Vec<SeedUser>,
    /// Tags to create up front. Tags named by tasks are created on demand.
    pub tags: Vec<String>,
}

pub struct SeedUser {
    pub full_name: Option<String>,
    pub nickname: String,
    pub email: Option<String>,
    pub password: String,
    pub about: Option<String>,
    pub role: Role,
    pub profile_image: Option<ImageFields>,
    pub tasks: Vec<SeedTask>,
}

pub struct SeedTask {
    pub name: String,
    pub difficulty_level: DifficultyLevel,
    pub description: Option<SeedDescription>,
    /// Number of (payload-free) hint rows to attach.
    pub hints: u32,
    pub tags: Vec<String>,
    pub solutions: Vec<SeedSolution>,
    pub votes: Vec<SeedVote>,
    pub test_data: Option<SeedTestData>,
}

pub struct SeedDescription {
    pub fields: DescriptionFields,
    pub images: Vec<ImageFields>,
}

pub struct SeedSolution {
    pub name: String,
    /// Nickname of the authoring user; must appear in `SeedGraph::users`.
    pub author: String,
    pub content: String,
    pub description: Option<SeedDescription>,
    pub votes: Vec<SeedVote>,
}

pub struct SeedVote {
    /// Nickname of the voting user; must appear in `SeedGraph::users`.
    pub user: String,
    pub stars_count: i16,
}

pub struct SeedTestData {
    pub cases: Vec<SeedTestCase>,
}

pub struct SeedTestCase {
    pub arguments: Option<String>,
    pub expected_result: Option<String>,
}

fn lookup(user_ids: &HashMap<String, UserId>, nickname: &str) -> Result<UserId> {
    match user_ids.get(nickname) {
        Some(id) => Ok(*id),
        None => Err(Error::Validation {
            field: "user",
            value: nickname.to_string(),
            reason: "unknown nickname in seed graph",
        }),
    }
}

/// Returns `true` if the graph was inserted, `false` if the store already
/// held data and the call was a no-op.
pub async fn apply(conn: &DbConn, graph: SeedGraph) -> Result<bool> {
    let already_seeded = !conn.user_select(Some(1)).await?.is_empty()
        || !conn.task_select(None, Some(1)).await?.is_empty();
    if already_seeded {
        log::info!("store already seeded; nothing to do");
        return Ok(false);
    }

    let mut tag_ids: HashMap<String, TagId> = HashMap::new();
    for text in &graph.tags {
        if !tag_ids.contains_key(text) {
            let tag = conn.tag_new(NewTag { text: text.clone() }).await?;
            tag_ids.insert(text.clone(), tag.id);
        }
    }

    // users first, so authorship and votes can refer to any nickname
    let mut user_ids: HashMap<String, UserId> = HashMap::new();
    for seed_user in &graph.users {
        let user = conn
            .user_new(NewUser {
                full_name: seed_user.full_name.clone(),
                nickname: seed_user.nickname.clone(),
                email: seed_user.email.clone(),
                password: seed_user.password.clone(),
                about: seed_user.about.clone(),
                role: seed_user.role,
            })
            .await?;
        if let Some(fields) = &seed_user.profile_image {
            conn.profile_image_new(NewProfileImage {
                user_id: user.id,
                fields: fields.clone(),
            })
            .await?;
        }
        user_ids.insert(seed_user.nickname.clone(), user.id);
    }

    let user_count = graph.users.len();
    for seed_user in graph.users {
        let author_id = lookup(&user_ids, &seed_user.nickname)?;
        for seed_task in seed_user.tasks {
            let task = conn
                .task_new(NewTask {
                    name: seed_task.name,
                    difficulty_level: seed_task.difficulty_level,
                    author_id,
                })
                .await?;
            if let Some(seed_description) = seed_task.description {
                let description = conn
                    .task_description_new(NewTaskDescription {
                        task_id: task.id,
                        fields: seed_description.fields,
                    })
                    .await?;
                for fields in seed_description.images {
                    conn.task_description_image_new(NewTaskDescriptionImage {
                        task_description_id: description.id,
                        fields,
                    })
                    .await?;
                }
            }
            for _ in 0..seed_task.hints {
                conn.hint_new(NewHint { task_id: task.id }).await?;
            }
            for text in seed_task.tags {
                let tag_id = match tag_ids.get(&text) {
                    Some(id) => *id,
                    None => {
                        let tag = conn.tag_new(NewTag { text: text.clone() }).await?;
                        tag_ids.insert(text, tag.id);
                        tag.id
                    }
                };
                conn.tag_attach(task.id, tag_id).await?;
            }
            for seed_solution in seed_task.solutions {
                let solution_author = lookup(&user_ids, &seed_solution.author)?;
                let solution = conn
                    .solution_new(NewSolution {
                        name: seed_solution.name,
                        task_id: task.id,
                        author_id: solution_author,
                        content: seed_solution.content,
                    })
                    .await?;
                if let Some(seed_description) = seed_solution.description {
                    let description = conn
                        .solution_description_new(NewSolutionDescription {
                            solution_id: solution.id,
                            fields: seed_description.fields,
                        })
                        .await?;
                    for fields in seed_description.images {
                        conn.solution_description_image_new(NewSolutionDescriptionImage {
                            solution_description_id: description.id,
                            fields,
                        })
                        .await?;
                    }
                }
                for seed_vote in seed_solution.votes {
                    let voter = lookup(&user_ids, &seed_vote.user)?;
                    conn.solution_vote_cast(NewSolutionVote {
                        solution_id: solution.id,
                        user_id: voter,
                        stars_count: seed_vote.stars_count,
                    })
                    .await?;
                }
            }
            for seed_vote in seed_task.votes {
                let voter = lookup(&user_ids, &seed_vote.user)?;
                conn.task_vote_cast(NewTaskVote {
                    task_id: task.id,
                    user_id: voter,
                    stars_count: seed_vote.stars_count,
                })
                .await?;
            }
            if let Some(seed_test_data) = seed_task.test_data {
                let data = conn.test_data_new(NewTestData { task_id: task.id }).await?;
                for case in seed_test_data.cases {
                    conn.test_case_new(NewTestCase {
                        test_data_id: data.id,
                        arguments: case.arguments,
                        expected_result: case.expected_result,
                    })
                    .await?;
                }
            }
        }
    }
    log::info!("seeded {} users and {} tags", user_count, tag_ids.len());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::FutureExt;

    fn sample_graph() -> SeedGraph {
        SeedGraph {
            users: vec![SeedUser {
                full_name: Some("Kumar Pandu".to_string()),
                nickname: "Djangolo".to_string(),
                email: Some("djangolo@mail.com".to_string()),
                password: "hunter2".to_string(),
                about: Some("Happy coder".to_string()),
                role: Role::User,
                profile_image: Some(ImageFields {
                    name: "avatar".to_string(),
                    content: vec![0xff, 0xd8, 0xff],
                }),
                tasks: vec![SeedTask {
                    name: "Addition".to_string(),
                    difficulty_level: DifficultyLevel::Easy,
                    description: Some(SeedDescription {
                        fields: DescriptionFields {
                            text: "Add two numbers".to_string(),
                            links: vec!["https://en.wikipedia.org/wiki/Addition".to_string()],
                        },
                        images: vec![],
                    }),
                    hints: 1,
                    tags: vec!["Math operations".to_string()],
                    solutions: vec![SeedSolution {
                        name: "Straightforward".to_string(),
                        author: "Djangolo".to_string(),
                        content: "fn add(a: i64, b: i64) -> i64 { a + b }".to_string(),
                        description: None,
                        votes: vec![],
                    }],
                    votes: vec![SeedVote {
                        user: "Djangolo".to_string(),
                        stars_count: 4,
                    }],
                    test_data: Some(SeedTestData {
                        cases: vec![SeedTestCase {
                            arguments: Some("2 2".to_string()),
                            expected_result: Some("4".to_string()),
                        }],
                    }),
                }],
            }],
            tags: vec!["Math operations".to_string()],
        }
    }

    #[test]
    fn test_apply_then_skip() {
        let conn = crate::connect::connect_memory().unwrap();
        let first = apply(&conn, sample_graph()).now_or_never().unwrap().unwrap();
        assert!(first);
        let second = apply(&conn, sample_graph()).now_or_never().unwrap().unwrap();
        assert!(!second);
        // no duplicates on the second run
        let users = conn.user_select(None).now_or_never().unwrap().unwrap();
        assert_eq!(users.len(), 1);
        let tags = conn.tag_select().now_or_never().unwrap().unwrap();
        assert_eq!(tags.len(), 1);
        let tasks = conn.task_select(None, None).now_or_never().unwrap().unwrap();
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn test_graph_is_wired() {
        let conn = crate::connect::connect_memory().unwrap();
        apply(&conn, sample_graph()).now_or_never().unwrap().unwrap();
        let user = conn
            .user_try_load_by_nickname("Djangolo")
            .now_or_never()
            .unwrap()
            .unwrap()
            .unwrap();
        // the cast vote landed on the author's aggregate
        assert_eq!(user.task_stars_received, 4);
        let image = conn
            .profile_image_try_load_by_user(user.id)
            .now_or_never()
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(image.fields.content, vec![0xff, 0xd8, 0xff]);
        let task = conn
            .task_select(Some(user.id), None)
            .now_or_never()
            .unwrap()
            .unwrap()
            .remove(0);
        assert_eq!(
            conn.tags_of_task(task.id)
                .now_or_never()
                .unwrap()
                .unwrap()
                .len(),
            1
        );
        let data = conn
            .test_data_try_load_by_task(task.id)
            .now_or_never()
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(
            conn.test_cases_of_data(data.id)
                .now_or_never()
                .unwrap()
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_unknown_nickname_rejected() {
        let conn = crate::connect::connect_memory().unwrap();
        let mut graph = sample_graph();
        graph.users[0].tasks[0].votes[0].user = "nobody".to_string();
        let err = apply(&conn, graph).now_or_never().unwrap();
        assert!(err.is_err());
    }
}
