//! End-to-end lifecycle checks against the in-memory backend, driven
//! through the public `DbConn` surface.

use db::schema::*;
use db::DbConn;
use futures::future::FutureExt;

fn conn() -> DbConn {
    db::connect::connect_memory().unwrap()
}

fn make_user(conn: &DbConn, nickname: &str) -> User {
    conn.user_new(NewUser {
        full_name: None,
        nickname: nickname.to_string(),
        email: None,
        password: "pw".to_string(),
        about: None,
        role: Role::User,
    })
    .now_or_never()
    .unwrap()
    .unwrap()
}

fn make_task(conn: &DbConn, author_id: UserId, name: &str) -> Task {
    conn.task_new(NewTask {
        name: name.to_string(),
        difficulty_level: DifficultyLevel::Easy,
        author_id,
    })
    .now_or_never()
    .unwrap()
    .unwrap()
}

#[test]
fn test_task_delete_removes_subtree_and_keeps_tag() {
    let conn = conn();
    let user = make_user(&conn, "Djangolo");
    let task = make_task(&conn, user.id, "Addition");
    let tag = conn
        .tag_new(NewTag {
            text: "Math operations".to_string(),
        })
        .now_or_never()
        .unwrap()
        .unwrap();
    conn.tag_attach(task.id, tag.id).now_or_never().unwrap().unwrap();
    let solution = conn
        .solution_new(NewSolution {
            name: "Straightforward".to_string(),
            task_id: task.id,
            author_id: user.id,
            content: "a + b".to_string(),
        })
        .now_or_never()
        .unwrap()
        .unwrap();
    let description = conn
        .task_description_new(NewTaskDescription {
            task_id: task.id,
            fields: DescriptionFields {
                text: "Given two integers, return their sum.".to_string(),
                links: vec![],
            },
        })
        .now_or_never()
        .unwrap()
        .unwrap();

    conn.task_delete(task.id).now_or_never().unwrap().unwrap();

    assert!(conn
        .solution_try_load(solution.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_none());
    assert!(conn
        .task_description_try_load_by_task(task.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_none());
    assert!(conn
        .tasks_with_tag(tag.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_empty());
    // the tag itself and the user survive
    assert!(conn
        .tag_try_load(tag.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_some());
    assert!(conn
        .user_try_load(user.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_some());
    let _ = description;
}

#[test]
fn test_task_delete_leaves_no_referencing_rows() {
    let conn = conn();
    let author = make_user(&conn, "author");
    let solver = make_user(&conn, "solver");
    let task = make_task(&conn, author.id, "task");
    let description = conn
        .task_description_new(NewTaskDescription {
            task_id: task.id,
            fields: DescriptionFields {
                text: "text".to_string(),
                links: vec![],
            },
        })
        .now_or_never()
        .unwrap()
        .unwrap();
    conn.task_description_image_new(NewTaskDescriptionImage {
        task_description_id: description.id,
        fields: ImageFields {
            name: "figure".to_string(),
            content: vec![1, 2, 3],
        },
    })
    .now_or_never()
    .unwrap()
    .unwrap();
    let solution = conn
        .solution_new(NewSolution {
            name: "solution".to_string(),
            task_id: task.id,
            author_id: solver.id,
            content: "code".to_string(),
        })
        .now_or_never()
        .unwrap()
        .unwrap();
    let solution_description = conn
        .solution_description_new(NewSolutionDescription {
            solution_id: solution.id,
            fields: DescriptionFields {
                text: "how it works".to_string(),
                links: vec![],
            },
        })
        .now_or_never()
        .unwrap()
        .unwrap();
    conn.hint_new(NewHint { task_id: task.id })
        .now_or_never()
        .unwrap()
        .unwrap();
    conn.task_vote_cast(NewTaskVote {
        task_id: task.id,
        user_id: solver.id,
        stars_count: 5,
    })
    .now_or_never()
    .unwrap()
    .unwrap();
    conn.solution_vote_cast(NewSolutionVote {
        solution_id: solution.id,
        user_id: author.id,
        stars_count: 3,
    })
    .now_or_never()
    .unwrap()
    .unwrap();
    let data = conn
        .test_data_new(NewTestData { task_id: task.id })
        .now_or_never()
        .unwrap()
        .unwrap();
    conn.test_case_new(NewTestCase {
        test_data_id: data.id,
        arguments: Some("1".to_string()),
        expected_result: Some("1".to_string()),
    })
    .now_or_never()
    .unwrap()
    .unwrap();

    conn.task_delete(task.id).now_or_never().unwrap().unwrap();

    assert!(conn
        .task_try_load(task.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_none());
    assert!(conn
        .task_description_try_load_by_task(task.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_none());
    assert!(conn
        .task_description_images(description.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_empty());
    assert!(conn
        .solutions_of_task(task.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_empty());
    assert!(conn
        .solution_description_images(solution_description.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_empty());
    assert!(conn
        .hints_of_task(task.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_empty());
    assert!(conn
        .task_votes_of_task(task.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_empty());
    assert!(conn
        .solution_votes_of_solution(solution.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_empty());
    assert!(conn
        .test_data_try_load_by_task(task.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_none());
    assert!(conn
        .test_cases_of_data(data.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_empty());
    // votes died with the task, so the aggregates returned to zero
    let author = conn.user_load(author.id).now_or_never().unwrap().unwrap();
    assert_eq!(author.task_stars_received, 0);
    let solver = conn.user_load(solver.id).now_or_never().unwrap().unwrap();
    assert_eq!(solver.solution_stars_received, 0);
}

#[test]
fn test_task_delete_removes_exactly_its_links() {
    let conn = conn();
    let user = make_user(&conn, "user");
    let task = make_task(&conn, user.id, "tagged");
    let other_task = make_task(&conn, user.id, "other");
    let mut tags = Vec::new();
    for text in &["dp", "graphs", "greedy"] {
        let tag = conn
            .tag_new(NewTag {
                text: text.to_string(),
            })
            .now_or_never()
            .unwrap()
            .unwrap();
        conn.tag_attach(task.id, tag.id).now_or_never().unwrap().unwrap();
        tags.push(tag);
    }
    conn.tag_attach(other_task.id, tags[0].id)
        .now_or_never()
        .unwrap()
        .unwrap();

    conn.task_delete(task.id).now_or_never().unwrap().unwrap();

    for tag in &tags {
        assert!(conn
            .tag_try_load(tag.id)
            .now_or_never()
            .unwrap()
            .unwrap()
            .is_some());
    }
    // the unrelated link is still there
    assert_eq!(
        conn.tasks_with_tag(tags[0].id)
            .now_or_never()
            .unwrap()
            .unwrap(),
        vec![other_task.id]
    );
}

#[test]
fn test_user_delete_cascades_to_owned_content() {
    let conn = conn();
    let doomed = make_user(&conn, "doomed");
    let survivor = make_user(&conn, "survivor");
    conn.profile_image_new(NewProfileImage {
        user_id: doomed.id,
        fields: ImageFields {
            name: "avatar".to_string(),
            content: vec![9, 9, 9],
        },
    })
    .now_or_never()
    .unwrap()
    .unwrap();
    // doomed's task, with a solution authored by the survivor
    let task = make_task(&conn, doomed.id, "doomed task");
    let survivor_solution = conn
        .solution_new(NewSolution {
            name: "survivor's solution".to_string(),
            task_id: task.id,
            author_id: survivor.id,
            content: "code".to_string(),
        })
        .now_or_never()
        .unwrap()
        .unwrap();
    // survivor's task, with a solution and votes by doomed
    let survivor_task = make_task(&conn, survivor.id, "survivor task");
    let doomed_solution = conn
        .solution_new(NewSolution {
            name: "doomed's solution".to_string(),
            task_id: survivor_task.id,
            author_id: doomed.id,
            content: "code".to_string(),
        })
        .now_or_never()
        .unwrap()
        .unwrap();
    conn.task_vote_cast(NewTaskVote {
        task_id: survivor_task.id,
        user_id: doomed.id,
        stars_count: 5,
    })
    .now_or_never()
    .unwrap()
    .unwrap();
    conn.solution_vote_cast(NewSolutionVote {
        solution_id: survivor_solution.id,
        user_id: doomed.id,
        stars_count: 2,
    })
    .now_or_never()
    .unwrap()
    .unwrap();

    conn.user_delete(doomed.id).now_or_never().unwrap().unwrap();

    assert!(conn
        .user_try_load(doomed.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_none());
    assert!(conn
        .profile_image_try_load_by_user(doomed.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_none());
    assert!(conn
        .task_try_load(task.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_none());
    // the survivor's solution lived on the doomed task, so it went with it
    assert!(conn
        .solution_try_load(survivor_solution.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_none());
    // authored by doomed, even though the parent task survives
    assert!(conn
        .solution_try_load(doomed_solution.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_none());
    assert!(conn
        .task_votes_of_task(survivor_task.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .is_empty());
    // survivor remains, with its aggregates back to zero
    let survivor = conn.user_load(survivor.id).now_or_never().unwrap().unwrap();
    assert_eq!(survivor.task_stars_received, 0);
    assert_eq!(survivor.solution_stars_received, 0);
}

#[test]
fn test_vote_boundaries_through_facade() {
    let conn = conn();
    let author = make_user(&conn, "author");
    let task = make_task(&conn, author.id, "task");
    for (nickname, stars) in &[("low", 0i16), ("high", 5i16)] {
        let voter = make_user(&conn, nickname);
        conn.task_vote_cast(NewTaskVote {
            task_id: task.id,
            user_id: voter.id,
            stars_count: *stars,
        })
        .now_or_never()
        .unwrap()
        .unwrap();
    }
    let rejected = make_user(&conn, "rejected");
    for stars in &[-1i16, 6i16] {
        let res = conn
            .task_vote_cast(NewTaskVote {
                task_id: task.id,
                user_id: rejected.id,
                stars_count: *stars,
            })
            .now_or_never()
            .unwrap();
        assert!(res.is_err());
    }
    // update path enforces the same interval
    let vote = conn
        .task_vote_cast(NewTaskVote {
            task_id: task.id,
            user_id: rejected.id,
            stars_count: 3,
        })
        .now_or_never()
        .unwrap()
        .unwrap();
    assert!(conn
        .task_vote_update(vote.id, 6)
        .now_or_never()
        .unwrap()
        .is_err());
    conn.task_vote_update(vote.id, 5).now_or_never().unwrap().unwrap();
}

#[test]
fn test_round_trip_preserves_bytes_and_link_order() {
    let conn = conn();
    let user = make_user(&conn, "user");
    let task = make_task(&conn, user.id, "task");
    let links = vec![
        "https://example.com/b".to_string(),
        "https://example.com/a".to_string(),
        "https://example.com/c".to_string(),
    ];
    let description = conn
        .task_description_new(NewTaskDescription {
            task_id: task.id,
            fields: DescriptionFields {
                text: "ordered links".to_string(),
                links: links.clone(),
            },
        })
        .now_or_never()
        .unwrap()
        .unwrap();
    let content: Vec<u8> = (0..=255).collect();
    let image = conn
        .task_description_image_new(NewTaskDescriptionImage {
            task_description_id: description.id,
            fields: ImageFields {
                name: "every byte".to_string(),
                content: content.clone(),
            },
        })
        .now_or_never()
        .unwrap()
        .unwrap();

    let loaded_description = conn
        .task_description_try_load_by_task(task.id)
        .now_or_never()
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(loaded_description, description);
    assert_eq!(loaded_description.fields.links, links);
    let loaded_images = conn
        .task_description_images(description.id)
        .now_or_never()
        .unwrap()
        .unwrap();
    assert_eq!(loaded_images, vec![image.clone()]);
    assert_eq!(loaded_images[0].fields.content, content);

    let loaded_task = conn.task_load(task.id).now_or_never().unwrap().unwrap();
    assert_eq!(loaded_task, task);
    let loaded_user = conn.user_load(user.id).now_or_never().unwrap().unwrap();
    assert_eq!(loaded_user, user);
}

#[test]
fn test_referential_rejections() {
    let conn = conn();
    let ghost = uuid::Uuid::new_v4();
    assert!(conn
        .task_new(NewTask {
            name: "orphan".to_string(),
            difficulty_level: DifficultyLevel::Easy,
            author_id: ghost,
        })
        .now_or_never()
        .unwrap()
        .is_err());
    let user = make_user(&conn, "user");
    assert!(conn
        .solution_new(NewSolution {
            name: "orphan".to_string(),
            task_id: ghost,
            author_id: user.id,
            content: "code".to_string(),
        })
        .now_or_never()
        .unwrap()
        .is_err());
    assert!(conn
        .hint_new(NewHint { task_id: ghost })
        .now_or_never()
        .unwrap()
        .is_err());
}
