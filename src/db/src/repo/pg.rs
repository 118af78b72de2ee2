use super::{Repo, SolutionsRepo, TagsRepo, TasksRepo, TestsRepo, UsersRepo, VotesRepo};
use crate::{
    error::{Error, Result},
    schema::*,
};
use bb8::{Pool, PooledConnection};
use tokio_postgres::Transaction;

type ConnectionManager = bb8_postgres::PostgresConnectionManager<tokio_postgres::tls::NoTls>;

#[derive(Debug, Clone)]
pub struct PgRepo {
    pool: Pool<ConnectionManager>,
}

impl PgRepo {
    async fn conn(&self) -> Result<PooledConnection<'_, ConnectionManager>> {
        Ok(self.pool.get().await?)
    }

    pub(crate) async fn new(conn_url: &str) -> Result<PgRepo> {
        let conn_manager =
            ConnectionManager::new_from_stringlike(conn_url, tokio_postgres::tls::NoTls)?;
        let mut pool_builder = Pool::builder();
        if let Some(timeout) = std::env::var("TASKFORGE_DB_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            let dur = std::time::Duration::from_secs(timeout);
            pool_builder = pool_builder.connection_timeout(dur);
        }
        let pool = pool_builder.build(conn_manager).await?;
        Ok(PgRepo { pool })
    }
}

async fn row_exists(tran: &Transaction<'_>, query: &str, id: uuid::Uuid) -> Result<bool> {
    Ok(tran.query_opt(query, &[&id]).await?.is_some())
}

async fn check_user_tx(tran: &Transaction<'_>, user_id: UserId) -> Result<()> {
    if row_exists(tran, "SELECT 1 FROM users WHERE id = $1", user_id).await? {
        Ok(())
    } else {
        Err(Error::MissingParent {
            table: "users",
            id: user_id,
        })
    }
}

async fn check_task_tx(tran: &Transaction<'_>, task_id: TaskId) -> Result<()> {
    if row_exists(tran, "SELECT 1 FROM tasks WHERE id = $1", task_id).await? {
        Ok(())
    } else {
        Err(Error::MissingParent {
            table: "tasks",
            id: task_id,
        })
    }
}

// Cascade procedures. Children are purged before their parent, inside the
// caller's transaction; star aggregates are corrected while the doomed vote
// rows still exist.

async fn purge_task(tran: &Transaction<'_>, task_id: TaskId) -> Result<()> {
    log::debug!("purging task {} and its subtree", task_id);
    tran.execute(
        "UPDATE users SET task_stars_received = task_stars_received - \
            (SELECT COALESCE(SUM(stars_count), 0) FROM task_votes WHERE task_id = $1) \
         WHERE id = (SELECT author_id FROM tasks WHERE id = $1)",
        &[&task_id],
    )
    .await?;
    tran.execute(
        "UPDATE users SET solution_stars_received = solution_stars_received - doomed.total \
         FROM (SELECT s.author_id AS author, SUM(v.stars_count) AS total \
               FROM solution_votes v INNER JOIN solutions s ON v.solution_id = s.id \
               WHERE s.task_id = $1 GROUP BY s.author_id) AS doomed \
         WHERE users.id = doomed.author",
        &[&task_id],
    )
    .await?;
    tran.execute("DELETE FROM task_votes WHERE task_id = $1", &[&task_id])
        .await?;
    tran.execute(
        "DELETE FROM solution_votes WHERE solution_id IN \
            (SELECT id FROM solutions WHERE task_id = $1)",
        &[&task_id],
    )
    .await?;
    tran.execute(
        "DELETE FROM solution_description_images WHERE solution_description_id IN \
            (SELECT d.id FROM solution_descriptions d \
             INNER JOIN solutions s ON d.solution_id = s.id WHERE s.task_id = $1)",
        &[&task_id],
    )
    .await?;
    tran.execute(
        "DELETE FROM solution_descriptions WHERE solution_id IN \
            (SELECT id FROM solutions WHERE task_id = $1)",
        &[&task_id],
    )
    .await?;
    tran.execute("DELETE FROM solutions WHERE task_id = $1", &[&task_id])
        .await?;
    tran.execute(
        "DELETE FROM test_cases WHERE test_data_id IN \
            (SELECT id FROM test_data WHERE task_id = $1)",
        &[&task_id],
    )
    .await?;
    tran.execute("DELETE FROM test_data WHERE task_id = $1", &[&task_id])
        .await?;
    tran.execute("DELETE FROM hints WHERE task_id = $1", &[&task_id])
        .await?;
    tran.execute(
        "DELETE FROM task_description_images WHERE task_description_id IN \
            (SELECT id FROM task_descriptions WHERE task_id = $1)",
        &[&task_id],
    )
    .await?;
    tran.execute(
        "DELETE FROM task_descriptions WHERE task_id = $1",
        &[&task_id],
    )
    .await?;
    // association rows only; the tags themselves survive
    tran.execute("DELETE FROM tasks_tags WHERE task_id = $1", &[&task_id])
        .await?;
    tran.execute("DELETE FROM tasks WHERE id = $1", &[&task_id])
        .await?;
    Ok(())
}

async fn purge_solution(tran: &Transaction<'_>, solution_id: SolutionId) -> Result<()> {
    log::debug!("purging solution {} and its subtree", solution_id);
    tran.execute(
        "UPDATE users SET solution_stars_received = solution_stars_received - \
            (SELECT COALESCE(SUM(stars_count), 0) FROM solution_votes WHERE solution_id = $1) \
         WHERE id = (SELECT author_id FROM solutions WHERE id = $1)",
        &[&solution_id],
    )
    .await?;
    tran.execute(
        "DELETE FROM solution_votes WHERE solution_id = $1",
        &[&solution_id],
    )
    .await?;
    tran.execute(
        "DELETE FROM solution_description_images WHERE solution_description_id IN \
            (SELECT id FROM solution_descriptions WHERE solution_id = $1)",
        &[&solution_id],
    )
    .await?;
    tran.execute(
        "DELETE FROM solution_descriptions WHERE solution_id = $1",
        &[&solution_id],
    )
    .await?;
    tran.execute("DELETE FROM solutions WHERE id = $1", &[&solution_id])
        .await?;
    Ok(())
}

async fn purge_user(tran: &Transaction<'_>, user_id: UserId) -> Result<()> {
    log::debug!("purging user {} and everything they own", user_id);
    // stars this user cast on surviving authors' tasks are handed back
    tran.execute(
        "UPDATE users SET task_stars_received = task_stars_received - doomed.total \
         FROM (SELECT t.author_id AS author, SUM(v.stars_count) AS total \
               FROM task_votes v INNER JOIN tasks t ON v.task_id = t.id \
               WHERE v.user_id = $1 GROUP BY t.author_id) AS doomed \
         WHERE users.id = doomed.author",
        &[&user_id],
    )
    .await?;
    // every doomed solution vote: cast by this user, or sitting on a
    // solution that dies with this user's tasks or authorship
    tran.execute(
        "UPDATE users SET solution_stars_received = solution_stars_received - doomed.total \
         FROM (SELECT s.author_id AS author, SUM(v.stars_count) AS total \
               FROM solution_votes v INNER JOIN solutions s ON v.solution_id = s.id \
               WHERE v.user_id = $1 OR s.author_id = $1 \
                  OR s.task_id IN (SELECT id FROM tasks WHERE author_id = $1) \
               GROUP BY s.author_id) AS doomed \
         WHERE users.id = doomed.author",
        &[&user_id],
    )
    .await?;
    tran.execute(
        "DELETE FROM task_votes WHERE user_id = $1 \
            OR task_id IN (SELECT id FROM tasks WHERE author_id = $1)",
        &[&user_id],
    )
    .await?;
    tran.execute(
        "DELETE FROM solution_votes WHERE user_id = $1 OR solution_id IN \
            (SELECT id FROM solutions WHERE author_id = $1 \
                OR task_id IN (SELECT id FROM tasks WHERE author_id = $1))",
        &[&user_id],
    )
    .await?;
    tran.execute(
        "DELETE FROM solution_description_images WHERE solution_description_id IN \
            (SELECT d.id FROM solution_descriptions d \
             INNER JOIN solutions s ON d.solution_id = s.id \
             WHERE s.author_id = $1 \
                OR s.task_id IN (SELECT id FROM tasks WHERE author_id = $1))",
        &[&user_id],
    )
    .await?;
    tran.execute(
        "DELETE FROM solution_descriptions WHERE solution_id IN \
            (SELECT id FROM solutions WHERE author_id = $1 \
                OR task_id IN (SELECT id FROM tasks WHERE author_id = $1))",
        &[&user_id],
    )
    .await?;
    tran.execute(
        "DELETE FROM solutions WHERE author_id = $1 \
            OR task_id IN (SELECT id FROM tasks WHERE author_id = $1)",
        &[&user_id],
    )
    .await?;
    tran.execute(
        "DELETE FROM test_cases WHERE test_data_id IN \
            (SELECT id FROM test_data WHERE task_id IN \
                (SELECT id FROM tasks WHERE author_id = $1))",
        &[&user_id],
    )
    .await?;
    tran.execute(
        "DELETE FROM test_data WHERE task_id IN (SELECT id FROM tasks WHERE author_id = $1)",
        &[&user_id],
    )
    .await?;
    tran.execute(
        "DELETE FROM hints WHERE task_id IN (SELECT id FROM tasks WHERE author_id = $1)",
        &[&user_id],
    )
    .await?;
    tran.execute(
        "DELETE FROM task_description_images WHERE task_description_id IN \
            (SELECT id FROM task_descriptions WHERE task_id IN \
                (SELECT id FROM tasks WHERE author_id = $1))",
        &[&user_id],
    )
    .await?;
    tran.execute(
        "DELETE FROM task_descriptions WHERE task_id IN \
            (SELECT id FROM tasks WHERE author_id = $1)",
        &[&user_id],
    )
    .await?;
    tran.execute(
        "DELETE FROM tasks_tags WHERE task_id IN (SELECT id FROM tasks WHERE author_id = $1)",
        &[&user_id],
    )
    .await?;
    tran.execute("DELETE FROM tasks WHERE author_id = $1", &[&user_id])
        .await?;
    tran.execute("DELETE FROM profile_images WHERE user_id = $1", &[&user_id])
        .await?;
    tran.execute("DELETE FROM users WHERE id = $1", &[&user_id])
        .await?;
    Ok(())
}

async fn purge_test_data(tran: &Transaction<'_>, test_data_id: TestDataId) -> Result<()> {
    tran.execute(
        "DELETE FROM test_cases WHERE test_data_id = $1",
        &[&test_data_id],
    )
    .await?;
    tran.execute("DELETE FROM test_data WHERE id = $1", &[&test_data_id])
        .await?;
    Ok(())
}

#[async_trait::async_trait]
impl UsersRepo for PgRepo {
    async fn user_new(&self, user_data: NewUser) -> Result<User> {
        user_data.validate()?;
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        let taken = tran
            .query_opt(
                "SELECT 1 FROM users WHERE nickname = $1",
                &[&user_data.nickname],
            )
            .await?
            .is_some();
        if taken {
            return Err(Error::validation(
                "nickname",
                &user_data.nickname,
                "already taken",
            ));
        }
        let now = crate::now();
        let user = User {
            id: uuid::Uuid::new_v4(),
            full_name: user_data.full_name,
            nickname: user_data.nickname,
            email: user_data.email,
            password: user_data.password,
            about: user_data.about,
            join_date: now,
            last_login: now,
            task_stars_received: 0,
            solution_stars_received: 0,
            role: user_data.role.into(),
        };
        tran.execute(
            "INSERT INTO users (id, full_name, nickname, email, password, about, join_date, \
                last_login, task_stars_received, solution_stars_received, role) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            &[
                &user.id,
                &user.full_name,
                &user.nickname,
                &user.email,
                &user.password,
                &user.about,
                &user.join_date,
                &user.last_login,
                &user.task_stars_received,
                &user.solution_stars_received,
                &user.role,
            ],
        )
        .await?;
        tran.commit().await?;
        Ok(user)
    }

    async fn user_try_load(&self, user_id: UserId) -> Result<Option<User>> {
        let row = self
            .conn()
            .await?
            .query_opt("SELECT * FROM users WHERE id = $1", &[&user_id])
            .await?;
        Ok(row.map(User::from_pg_row))
    }

    async fn user_try_load_by_nickname(&self, nickname: &str) -> Result<Option<User>> {
        let row = self
            .conn()
            .await?
            .query_opt("SELECT * FROM users WHERE nickname = $1", &[&nickname])
            .await?;
        Ok(row.map(User::from_pg_row))
    }

    async fn user_update(&self, user_id: UserId, patch: UserPatch) -> Result<()> {
        patch.validate()?;
        let affected = self
            .conn()
            .await?
            .execute(
                "UPDATE users SET \
                    full_name = COALESCE($1, full_name), \
                    email = COALESCE($2, email), \
                    about = COALESCE($3, about), \
                    password = COALESCE($4, password), \
                    last_login = COALESCE($5, last_login), \
                    role = COALESCE($6, role) \
                 WHERE id = $7",
                &[
                    &patch.full_name,
                    &patch.email,
                    &patch.about,
                    &patch.password,
                    &patch.last_login,
                    &patch.role,
                    &user_id,
                ],
            )
            .await?;
        if affected == 0 {
            return Err(Error::NotFound {
                table: "users",
                id: user_id,
            });
        }
        Ok(())
    }

    async fn user_delete(&self, user_id: UserId) -> Result<()> {
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        if !row_exists(&tran, "SELECT 1 FROM users WHERE id = $1", user_id).await? {
            return Err(Error::NotFound {
                table: "users",
                id: user_id,
            });
        }
        if let Err(source) = purge_user(&tran, user_id).await {
            // dropping the transaction rolls every step back
            return Err(Error::Cascade {
                root: "users",
                id: user_id,
                source: Box::new(source),
            });
        }
        tran.commit().await?;
        Ok(())
    }

    async fn user_select(&self, limit: Option<u32>) -> Result<Vec<User>> {
        let limit = limit.map(i64::from).unwrap_or(i64::max_value());
        let rows = self
            .conn()
            .await?
            .query("SELECT * FROM users LIMIT $1", &[&limit])
            .await?;
        Ok(rows.into_iter().map(User::from_pg_row).collect())
    }

    async fn profile_image_new(&self, image_data: NewProfileImage) -> Result<ProfileImage> {
        image_data.validate()?;
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        check_user_tx(&tran, image_data.user_id).await?;
        let occupied = row_exists(
            &tran,
            "SELECT 1 FROM profile_images WHERE user_id = $1",
            image_data.user_id,
        )
        .await?;
        if occupied {
            return Err(Error::validation(
                "user_id",
                image_data.user_id,
                "user already has a profile image",
            ));
        }
        let image = ProfileImage {
            id: uuid::Uuid::new_v4(),
            user_id: image_data.user_id,
            fields: image_data.fields,
            upload_date: crate::now(),
        };
        tran.execute(
            "INSERT INTO profile_images (id, user_id, name, content, upload_date) \
             VALUES ($1, $2, $3, $4, $5)",
            &[
                &image.id,
                &image.user_id,
                &image.fields.name,
                &image.fields.content,
                &image.upload_date,
            ],
        )
        .await?;
        tran.commit().await?;
        Ok(image)
    }

    async fn profile_image_try_load_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<ProfileImage>> {
        let row = self
            .conn()
            .await?
            .query_opt(
                "SELECT * FROM profile_images WHERE user_id = $1",
                &[&user_id],
            )
            .await?;
        Ok(row.map(ProfileImage::from_pg_row))
    }

    async fn profile_image_delete(&self, image_id: ImageId) -> Result<()> {
        let affected = self
            .conn()
            .await?
            .execute("DELETE FROM profile_images WHERE id = $1", &[&image_id])
            .await?;
        if affected == 0 {
            return Err(Error::NotFound {
                table: "profile_images",
                id: image_id,
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl TasksRepo for PgRepo {
    async fn task_new(&self, task_data: NewTask) -> Result<Task> {
        task_data.validate()?;
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        check_user_tx(&tran, task_data.author_id).await?;
        let now = crate::now();
        let task = Task {
            id: uuid::Uuid::new_v4(),
            name: task_data.name,
            difficulty_level: task_data.difficulty_level.into(),
            create_date: now,
            last_modified: now,
            author_id: task_data.author_id,
        };
        tran.execute(
            "INSERT INTO tasks (id, name, difficulty_level, create_date, last_modified, author_id) \
             VALUES ($1, $2, $3, $4, $5, $6)",
            &[
                &task.id,
                &task.name,
                &task.difficulty_level,
                &task.create_date,
                &task.last_modified,
                &task.author_id,
            ],
        )
        .await?;
        tran.commit().await?;
        Ok(task)
    }

    async fn task_try_load(&self, task_id: TaskId) -> Result<Option<Task>> {
        let row = self
            .conn()
            .await?
            .query_opt("SELECT * FROM tasks WHERE id = $1", &[&task_id])
            .await?;
        Ok(row.map(Task::from_pg_row))
    }

    async fn task_update(&self, task_id: TaskId, patch: TaskPatch) -> Result<()> {
        patch.validate()?;
        let now = crate::now();
        let affected = self
            .conn()
            .await?
            .execute(
                "UPDATE tasks SET \
                    name = COALESCE($1, name), \
                    difficulty_level = COALESCE($2, difficulty_level), \
                    last_modified = $3 \
                 WHERE id = $4",
                &[&patch.name, &patch.difficulty_level, &now, &task_id],
            )
            .await?;
        if affected == 0 {
            return Err(Error::NotFound {
                table: "tasks",
                id: task_id,
            });
        }
        Ok(())
    }

    async fn task_delete(&self, task_id: TaskId) -> Result<()> {
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        if !row_exists(&tran, "SELECT 1 FROM tasks WHERE id = $1", task_id).await? {
            return Err(Error::NotFound {
                table: "tasks",
                id: task_id,
            });
        }
        if let Err(source) = purge_task(&tran, task_id).await {
            return Err(Error::Cascade {
                root: "tasks",
                id: task_id,
                source: Box::new(source),
            });
        }
        tran.commit().await?;
        Ok(())
    }

    async fn task_select(
        &self,
        author_id: Option<UserId>,
        limit: Option<u32>,
    ) -> Result<Vec<Task>> {
        let limit = limit.map(i64::from).unwrap_or(i64::max_value());
        let rows = self
            .conn()
            .await?
            .query(
                "SELECT * FROM tasks WHERE COALESCE(author_id = $1, TRUE) LIMIT $2",
                &[&author_id, &limit],
            )
            .await?;
        Ok(rows.into_iter().map(Task::from_pg_row).collect())
    }

    async fn task_description_new(
        &self,
        description_data: NewTaskDescription,
    ) -> Result<TaskDescription> {
        description_data.validate()?;
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        check_task_tx(&tran, description_data.task_id).await?;
        let occupied = row_exists(
            &tran,
            "SELECT 1 FROM task_descriptions WHERE task_id = $1",
            description_data.task_id,
        )
        .await?;
        if occupied {
            return Err(Error::validation(
                "task_id",
                description_data.task_id,
                "task already has a description",
            ));
        }
        let description = TaskDescription {
            id: uuid::Uuid::new_v4(),
            task_id: description_data.task_id,
            fields: description_data.fields,
        };
        tran.execute(
            "INSERT INTO task_descriptions (id, task_id, text, links) VALUES ($1, $2, $3, $4)",
            &[
                &description.id,
                &description.task_id,
                &description.fields.text,
                &description.fields.links,
            ],
        )
        .await?;
        tran.commit().await?;
        Ok(description)
    }

    async fn task_description_try_load_by_task(
        &self,
        task_id: TaskId,
    ) -> Result<Option<TaskDescription>> {
        let row = self
            .conn()
            .await?
            .query_opt(
                "SELECT * FROM task_descriptions WHERE task_id = $1",
                &[&task_id],
            )
            .await?;
        Ok(row.map(TaskDescription::from_pg_row))
    }

    async fn task_description_image_new(
        &self,
        image_data: NewTaskDescriptionImage,
    ) -> Result<TaskDescriptionImage> {
        image_data.validate()?;
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        let parent_exists = row_exists(
            &tran,
            "SELECT 1 FROM task_descriptions WHERE id = $1",
            image_data.task_description_id,
        )
        .await?;
        if !parent_exists {
            return Err(Error::MissingParent {
                table: "task_descriptions",
                id: image_data.task_description_id,
            });
        }
        let image = TaskDescriptionImage {
            id: uuid::Uuid::new_v4(),
            task_description_id: image_data.task_description_id,
            fields: image_data.fields,
            upload_date: crate::now(),
        };
        tran.execute(
            "INSERT INTO task_description_images (id, task_description_id, name, content, upload_date) \
             VALUES ($1, $2, $3, $4, $5)",
            &[
                &image.id,
                &image.task_description_id,
                &image.fields.name,
                &image.fields.content,
                &image.upload_date,
            ],
        )
        .await?;
        tran.commit().await?;
        Ok(image)
    }

    async fn task_description_images(
        &self,
        description_id: DescriptionId,
    ) -> Result<Vec<TaskDescriptionImage>> {
        let rows = self
            .conn()
            .await?
            .query(
                "SELECT * FROM task_description_images WHERE task_description_id = $1",
                &[&description_id],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(TaskDescriptionImage::from_pg_row)
            .collect())
    }

    async fn hint_new(&self, hint_data: NewHint) -> Result<Hint> {
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        check_task_tx(&tran, hint_data.task_id).await?;
        let hint = Hint {
            id: uuid::Uuid::new_v4(),
            task_id: hint_data.task_id,
        };
        tran.execute(
            "INSERT INTO hints (id, task_id) VALUES ($1, $2)",
            &[&hint.id, &hint.task_id],
        )
        .await?;
        tran.commit().await?;
        Ok(hint)
    }

    async fn hints_of_task(&self, task_id: TaskId) -> Result<Vec<Hint>> {
        let rows = self
            .conn()
            .await?
            .query("SELECT * FROM hints WHERE task_id = $1", &[&task_id])
            .await?;
        Ok(rows.into_iter().map(Hint::from_pg_row).collect())
    }

    async fn hint_delete(&self, hint_id: HintId) -> Result<()> {
        let affected = self
            .conn()
            .await?
            .execute("DELETE FROM hints WHERE id = $1", &[&hint_id])
            .await?;
        if affected == 0 {
            return Err(Error::NotFound {
                table: "hints",
                id: hint_id,
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SolutionsRepo for PgRepo {
    async fn solution_new(&self, solution_data: NewSolution) -> Result<Solution> {
        solution_data.validate()?;
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        check_task_tx(&tran, solution_data.task_id).await?;
        check_user_tx(&tran, solution_data.author_id).await?;
        let now = crate::now();
        let solution = Solution {
            id: uuid::Uuid::new_v4(),
            name: solution_data.name,
            task_id: solution_data.task_id,
            author_id: solution_data.author_id,
            content: solution_data.content,
            create_date: now,
            last_modified: now,
        };
        tran.execute(
            "INSERT INTO solutions (id, name, task_id, author_id, content, create_date, last_modified) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
            &[
                &solution.id,
                &solution.name,
                &solution.task_id,
                &solution.author_id,
                &solution.content,
                &solution.create_date,
                &solution.last_modified,
            ],
        )
        .await?;
        tran.commit().await?;
        Ok(solution)
    }

    async fn solution_try_load(&self, solution_id: SolutionId) -> Result<Option<Solution>> {
        let row = self
            .conn()
            .await?
            .query_opt("SELECT * FROM solutions WHERE id = $1", &[&solution_id])
            .await?;
        Ok(row.map(Solution::from_pg_row))
    }

    async fn solution_update(&self, solution_id: SolutionId, patch: SolutionPatch) -> Result<()> {
        patch.validate()?;
        let now = crate::now();
        let affected = self
            .conn()
            .await?
            .execute(
                "UPDATE solutions SET \
                    name = COALESCE($1, name), \
                    content = COALESCE($2, content), \
                    last_modified = $3 \
                 WHERE id = $4",
                &[&patch.name, &patch.content, &now, &solution_id],
            )
            .await?;
        if affected == 0 {
            return Err(Error::NotFound {
                table: "solutions",
                id: solution_id,
            });
        }
        Ok(())
    }

    async fn solution_delete(&self, solution_id: SolutionId) -> Result<()> {
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        if !row_exists(&tran, "SELECT 1 FROM solutions WHERE id = $1", solution_id).await? {
            return Err(Error::NotFound {
                table: "solutions",
                id: solution_id,
            });
        }
        if let Err(source) = purge_solution(&tran, solution_id).await {
            return Err(Error::Cascade {
                root: "solutions",
                id: solution_id,
                source: Box::new(source),
            });
        }
        tran.commit().await?;
        Ok(())
    }

    async fn solutions_of_task(&self, task_id: TaskId) -> Result<Vec<Solution>> {
        let rows = self
            .conn()
            .await?
            .query("SELECT * FROM solutions WHERE task_id = $1", &[&task_id])
            .await?;
        Ok(rows.into_iter().map(Solution::from_pg_row).collect())
    }

    async fn solution_select(
        &self,
        author_id: Option<UserId>,
        limit: Option<u32>,
    ) -> Result<Vec<Solution>> {
        let limit = limit.map(i64::from).unwrap_or(i64::max_value());
        let rows = self
            .conn()
            .await?
            .query(
                "SELECT * FROM solutions WHERE COALESCE(author_id = $1, TRUE) LIMIT $2",
                &[&author_id, &limit],
            )
            .await?;
        Ok(rows.into_iter().map(Solution::from_pg_row).collect())
    }

    async fn solution_description_new(
        &self,
        description_data: NewSolutionDescription,
    ) -> Result<SolutionDescription> {
        description_data.validate()?;
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        let parent_exists = row_exists(
            &tran,
            "SELECT 1 FROM solutions WHERE id = $1",
            description_data.solution_id,
        )
        .await?;
        if !parent_exists {
            return Err(Error::MissingParent {
                table: "solutions",
                id: description_data.solution_id,
            });
        }
        let occupied = row_exists(
            &tran,
            "SELECT 1 FROM solution_descriptions WHERE solution_id = $1",
            description_data.solution_id,
        )
        .await?;
        if occupied {
            return Err(Error::validation(
                "solution_id",
                description_data.solution_id,
                "solution already has a description",
            ));
        }
        let description = SolutionDescription {
            id: uuid::Uuid::new_v4(),
            solution_id: description_data.solution_id,
            fields: description_data.fields,
        };
        tran.execute(
            "INSERT INTO solution_descriptions (id, solution_id, text, links) \
             VALUES ($1, $2, $3, $4)",
            &[
                &description.id,
                &description.solution_id,
                &description.fields.text,
                &description.fields.links,
            ],
        )
        .await?;
        tran.commit().await?;
        Ok(description)
    }

    async fn solution_description_try_load_by_solution(
        &self,
        solution_id: SolutionId,
    ) -> Result<Option<SolutionDescription>> {
        let row = self
            .conn()
            .await?
            .query_opt(
                "SELECT * FROM solution_descriptions WHERE solution_id = $1",
                &[&solution_id],
            )
            .await?;
        Ok(row.map(SolutionDescription::from_pg_row))
    }

    async fn solution_description_image_new(
        &self,
        image_data: NewSolutionDescriptionImage,
    ) -> Result<SolutionDescriptionImage> {
        image_data.validate()?;
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        let parent_exists = row_exists(
            &tran,
            "SELECT 1 FROM solution_descriptions WHERE id = $1",
            image_data.solution_description_id,
        )
        .await?;
        if !parent_exists {
            return Err(Error::MissingParent {
                table: "solution_descriptions",
                id: image_data.solution_description_id,
            });
        }
        let image = SolutionDescriptionImage {
            id: uuid::Uuid::new_v4(),
            solution_description_id: image_data.solution_description_id,
            fields: image_data.fields,
            upload_date: crate::now(),
        };
        tran.execute(
            "INSERT INTO solution_description_images \
                (id, solution_description_id, name, content, upload_date) \
             VALUES ($1, $2, $3, $4, $5)",
            &[
                &image.id,
                &image.solution_description_id,
                &image.fields.name,
                &image.fields.content,
                &image.upload_date,
            ],
        )
        .await?;
        tran.commit().await?;
        Ok(image)
    }

    async fn solution_description_images(
        &self,
        description_id: DescriptionId,
    ) -> Result<Vec<SolutionDescriptionImage>> {
        let rows = self
            .conn()
            .await?
            .query(
                "SELECT * FROM solution_description_images WHERE solution_description_id = $1",
                &[&description_id],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(SolutionDescriptionImage::from_pg_row)
            .collect())
    }
}

#[async_trait::async_trait]
impl TagsRepo for PgRepo {
    async fn tag_new(&self, tag_data: NewTag) -> Result<Tag> {
        tag_data.validate()?;
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        let taken = tran
            .query_opt("SELECT 1 FROM tags WHERE text = $1", &[&tag_data.text])
            .await?
            .is_some();
        if taken {
            return Err(Error::validation("text", &tag_data.text, "already exists"));
        }
        let tag = Tag {
            id: uuid::Uuid::new_v4(),
            text: tag_data.text,
        };
        tran.execute(
            "INSERT INTO tags (id, text) VALUES ($1, $2)",
            &[&tag.id, &tag.text],
        )
        .await?;
        tran.commit().await?;
        Ok(tag)
    }

    async fn tag_try_load(&self, tag_id: TagId) -> Result<Option<Tag>> {
        let row = self
            .conn()
            .await?
            .query_opt("SELECT * FROM tags WHERE id = $1", &[&tag_id])
            .await?;
        Ok(row.map(Tag::from_pg_row))
    }

    async fn tag_try_load_by_text(&self, text: &str) -> Result<Option<Tag>> {
        let row = self
            .conn()
            .await?
            .query_opt("SELECT * FROM tags WHERE text = $1", &[&text])
            .await?;
        Ok(row.map(Tag::from_pg_row))
    }

    async fn tag_select(&self) -> Result<Vec<Tag>> {
        let rows = self.conn().await?.query("SELECT * FROM tags", &[]).await?;
        Ok(rows.into_iter().map(Tag::from_pg_row).collect())
    }

    async fn tag_delete(&self, tag_id: TagId) -> Result<()> {
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        if !row_exists(&tran, "SELECT 1 FROM tags WHERE id = $1", tag_id).await? {
            return Err(Error::NotFound {
                table: "tags",
                id: tag_id,
            });
        }
        tran.execute("DELETE FROM tasks_tags WHERE tag_id = $1", &[&tag_id])
            .await?;
        tran.execute("DELETE FROM tags WHERE id = $1", &[&tag_id])
            .await?;
        tran.commit().await?;
        Ok(())
    }

    async fn tag_attach(&self, task_id: TaskId, tag_id: TagId) -> Result<()> {
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        check_task_tx(&tran, task_id).await?;
        if !row_exists(&tran, "SELECT 1 FROM tags WHERE id = $1", tag_id).await? {
            return Err(Error::MissingParent {
                table: "tags",
                id: tag_id,
            });
        }
        tran.execute(
            "INSERT INTO tasks_tags (task_id, tag_id) VALUES ($1, $2) \
             ON CONFLICT (task_id, tag_id) DO NOTHING",
            &[&task_id, &tag_id],
        )
        .await?;
        tran.commit().await?;
        Ok(())
    }

    async fn tag_detach(&self, task_id: TaskId, tag_id: TagId) -> Result<()> {
        self.conn()
            .await?
            .execute(
                "DELETE FROM tasks_tags WHERE task_id = $1 AND tag_id = $2",
                &[&task_id, &tag_id],
            )
            .await?;
        Ok(())
    }

    async fn tags_of_task(&self, task_id: TaskId) -> Result<Vec<Tag>> {
        let rows = self
            .conn()
            .await?
            .query(
                "SELECT tags.* FROM tags \
                 INNER JOIN tasks_tags ON tags.id = tasks_tags.tag_id \
                 WHERE tasks_tags.task_id = $1",
                &[&task_id],
            )
            .await?;
        Ok(rows.into_iter().map(Tag::from_pg_row).collect())
    }

    async fn tasks_with_tag(&self, tag_id: TagId) -> Result<Vec<TaskId>> {
        let rows = self
            .conn()
            .await?
            .query("SELECT task_id FROM tasks_tags WHERE tag_id = $1", &[&tag_id])
            .await?;
        Ok(rows.into_iter().map(|row| row.get("task_id")).collect())
    }
}

#[async_trait::async_trait]
impl VotesRepo for PgRepo {
    async fn task_vote_cast(&self, vote_data: NewTaskVote) -> Result<TaskVote> {
        check_stars(vote_data.stars_count)?;
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        let author_row = tran
            .query_opt(
                "SELECT author_id FROM tasks WHERE id = $1",
                &[&vote_data.task_id],
            )
            .await?;
        let author_id: UserId = match author_row {
            Some(row) => row.get("author_id"),
            None => {
                return Err(Error::MissingParent {
                    table: "tasks",
                    id: vote_data.task_id,
                })
            }
        };
        check_user_tx(&tran, vote_data.user_id).await?;
        let duplicate = tran
            .query_opt(
                "SELECT 1 FROM task_votes WHERE task_id = $1 AND user_id = $2",
                &[&vote_data.task_id, &vote_data.user_id],
            )
            .await?
            .is_some();
        if duplicate {
            return Err(Error::validation(
                "user_id",
                vote_data.user_id,
                "user already voted for this task",
            ));
        }
        let vote = TaskVote {
            id: uuid::Uuid::new_v4(),
            task_id: vote_data.task_id,
            user_id: vote_data.user_id,
            stars_count: vote_data.stars_count,
        };
        tran.execute(
            "INSERT INTO task_votes (id, task_id, user_id, stars_count) VALUES ($1, $2, $3, $4)",
            &[&vote.id, &vote.task_id, &vote.user_id, &vote.stars_count],
        )
        .await?;
        let stars = i32::from(vote.stars_count);
        tran.execute(
            "UPDATE users SET task_stars_received = task_stars_received + $1 WHERE id = $2",
            &[&stars, &author_id],
        )
        .await?;
        tran.commit().await?;
        Ok(vote)
    }

    async fn task_vote_try_load(&self, vote_id: VoteId) -> Result<Option<TaskVote>> {
        let row = self
            .conn()
            .await?
            .query_opt("SELECT * FROM task_votes WHERE id = $1", &[&vote_id])
            .await?;
        Ok(row.map(TaskVote::from_pg_row))
    }

    async fn task_vote_update(&self, vote_id: VoteId, stars_count: i16) -> Result<()> {
        check_stars(stars_count)?;
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        let row = tran
            .query_opt(
                "SELECT task_id, stars_count FROM task_votes WHERE id = $1",
                &[&vote_id],
            )
            .await?;
        let (task_id, old_stars): (TaskId, i16) = match row {
            Some(row) => (row.get("task_id"), row.get("stars_count")),
            None => {
                return Err(Error::NotFound {
                    table: "task_votes",
                    id: vote_id,
                })
            }
        };
        tran.execute(
            "UPDATE task_votes SET stars_count = $1 WHERE id = $2",
            &[&stars_count, &vote_id],
        )
        .await?;
        let delta = i32::from(stars_count) - i32::from(old_stars);
        tran.execute(
            "UPDATE users SET task_stars_received = task_stars_received + $1 \
             WHERE id = (SELECT author_id FROM tasks WHERE id = $2)",
            &[&delta, &task_id],
        )
        .await?;
        tran.commit().await?;
        Ok(())
    }

    async fn task_vote_delete(&self, vote_id: VoteId) -> Result<()> {
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        let row = tran
            .query_opt(
                "SELECT task_id, stars_count FROM task_votes WHERE id = $1",
                &[&vote_id],
            )
            .await?;
        let (task_id, stars): (TaskId, i16) = match row {
            Some(row) => (row.get("task_id"), row.get("stars_count")),
            None => {
                return Err(Error::NotFound {
                    table: "task_votes",
                    id: vote_id,
                })
            }
        };
        tran.execute("DELETE FROM task_votes WHERE id = $1", &[&vote_id])
            .await?;
        let stars = i32::from(stars);
        tran.execute(
            "UPDATE users SET task_stars_received = task_stars_received - $1 \
             WHERE id = (SELECT author_id FROM tasks WHERE id = $2)",
            &[&stars, &task_id],
        )
        .await?;
        tran.commit().await?;
        Ok(())
    }

    async fn task_votes_of_task(&self, task_id: TaskId) -> Result<Vec<TaskVote>> {
        let rows = self
            .conn()
            .await?
            .query("SELECT * FROM task_votes WHERE task_id = $1", &[&task_id])
            .await?;
        Ok(rows.into_iter().map(TaskVote::from_pg_row).collect())
    }

    async fn solution_vote_cast(&self, vote_data: NewSolutionVote) -> Result<SolutionVote> {
        check_stars(vote_data.stars_count)?;
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        let author_row = tran
            .query_opt(
                "SELECT author_id FROM solutions WHERE id = $1",
                &[&vote_data.solution_id],
            )
            .await?;
        let author_id: UserId = match author_row {
            Some(row) => row.get("author_id"),
            None => {
                return Err(Error::MissingParent {
                    table: "solutions",
                    id: vote_data.solution_id,
                })
            }
        };
        check_user_tx(&tran, vote_data.user_id).await?;
        let duplicate = tran
            .query_opt(
                "SELECT 1 FROM solution_votes WHERE solution_id = $1 AND user_id = $2",
                &[&vote_data.solution_id, &vote_data.user_id],
            )
            .await?
            .is_some();
        if duplicate {
            return Err(Error::validation(
                "user_id",
                vote_data.user_id,
                "user already voted for this solution",
            ));
        }
        let vote = SolutionVote {
            id: uuid::Uuid::new_v4(),
            solution_id: vote_data.solution_id,
            user_id: vote_data.user_id,
            stars_count: vote_data.stars_count,
        };
        tran.execute(
            "INSERT INTO solution_votes (id, solution_id, user_id, stars_count) \
             VALUES ($1, $2, $3, $4)",
            &[&vote.id, &vote.solution_id, &vote.user_id, &vote.stars_count],
        )
        .await?;
        let stars = i32::from(vote.stars_count);
        tran.execute(
            "UPDATE users SET solution_stars_received = solution_stars_received + $1 WHERE id = $2",
            &[&stars, &author_id],
        )
        .await?;
        tran.commit().await?;
        Ok(vote)
    }

    async fn solution_vote_try_load(&self, vote_id: VoteId) -> Result<Option<SolutionVote>> {
        let row = self
            .conn()
            .await?
            .query_opt("SELECT * FROM solution_votes WHERE id = $1", &[&vote_id])
            .await?;
        Ok(row.map(SolutionVote::from_pg_row))
    }

    async fn solution_vote_update(&self, vote_id: VoteId, stars_count: i16) -> Result<()> {
        check_stars(stars_count)?;
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        let row = tran
            .query_opt(
                "SELECT solution_id, stars_count FROM solution_votes WHERE id = $1",
                &[&vote_id],
            )
            .await?;
        let (solution_id, old_stars): (SolutionId, i16) = match row {
            Some(row) => (row.get("solution_id"), row.get("stars_count")),
            None => {
                return Err(Error::NotFound {
                    table: "solution_votes",
                    id: vote_id,
                })
            }
        };
        tran.execute(
            "UPDATE solution_votes SET stars_count = $1 WHERE id = $2",
            &[&stars_count, &vote_id],
        )
        .await?;
        let delta = i32::from(stars_count) - i32::from(old_stars);
        tran.execute(
            "UPDATE users SET solution_stars_received = solution_stars_received + $1 \
             WHERE id = (SELECT author_id FROM solutions WHERE id = $2)",
            &[&delta, &solution_id],
        )
        .await?;
        tran.commit().await?;
        Ok(())
    }

    async fn solution_vote_delete(&self, vote_id: VoteId) -> Result<()> {
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        let row = tran
            .query_opt(
                "SELECT solution_id, stars_count FROM solution_votes WHERE id = $1",
                &[&vote_id],
            )
            .await?;
        let (solution_id, stars): (SolutionId, i16) = match row {
            Some(row) => (row.get("solution_id"), row.get("stars_count")),
            None => {
                return Err(Error::NotFound {
                    table: "solution_votes",
                    id: vote_id,
                })
            }
        };
        tran.execute("DELETE FROM solution_votes WHERE id = $1", &[&vote_id])
            .await?;
        let stars = i32::from(stars);
        tran.execute(
            "UPDATE users SET solution_stars_received = solution_stars_received - $1 \
             WHERE id = (SELECT author_id FROM solutions WHERE id = $2)",
            &[&stars, &solution_id],
        )
        .await?;
        tran.commit().await?;
        Ok(())
    }

    async fn solution_votes_of_solution(
        &self,
        solution_id: SolutionId,
    ) -> Result<Vec<SolutionVote>> {
        let rows = self
            .conn()
            .await?
            .query(
                "SELECT * FROM solution_votes WHERE solution_id = $1",
                &[&solution_id],
            )
            .await?;
        Ok(rows.into_iter().map(SolutionVote::from_pg_row).collect())
    }
}

#[async_trait::async_trait]
impl TestsRepo for PgRepo {
    async fn test_data_new(&self, data: NewTestData) -> Result<TestData> {
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        check_task_tx(&tran, data.task_id).await?;
        let occupied = row_exists(
            &tran,
            "SELECT 1 FROM test_data WHERE task_id = $1",
            data.task_id,
        )
        .await?;
        if occupied {
            return Err(Error::validation(
                "task_id",
                data.task_id,
                "task already has test data",
            ));
        }
        let row = TestData {
            id: uuid::Uuid::new_v4(),
            task_id: data.task_id,
        };
        tran.execute(
            "INSERT INTO test_data (id, task_id) VALUES ($1, $2)",
            &[&row.id, &row.task_id],
        )
        .await?;
        tran.commit().await?;
        Ok(row)
    }

    async fn test_data_try_load_by_task(&self, task_id: TaskId) -> Result<Option<TestData>> {
        let row = self
            .conn()
            .await?
            .query_opt("SELECT * FROM test_data WHERE task_id = $1", &[&task_id])
            .await?;
        Ok(row.map(TestData::from_pg_row))
    }

    async fn test_data_delete(&self, test_data_id: TestDataId) -> Result<()> {
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        if !row_exists(&tran, "SELECT 1 FROM test_data WHERE id = $1", test_data_id).await? {
            return Err(Error::NotFound {
                table: "test_data",
                id: test_data_id,
            });
        }
        if let Err(source) = purge_test_data(&tran, test_data_id).await {
            return Err(Error::Cascade {
                root: "test_data",
                id: test_data_id,
                source: Box::new(source),
            });
        }
        tran.commit().await?;
        Ok(())
    }

    async fn test_case_new(&self, case_data: NewTestCase) -> Result<TestCase> {
        let mut conn = self.conn().await?;
        let tran = conn.transaction().await?;
        let parent_exists = row_exists(
            &tran,
            "SELECT 1 FROM test_data WHERE id = $1",
            case_data.test_data_id,
        )
        .await?;
        if !parent_exists {
            return Err(Error::MissingParent {
                table: "test_data",
                id: case_data.test_data_id,
            });
        }
        let case = TestCase {
            id: uuid::Uuid::new_v4(),
            arguments: case_data.arguments,
            expected_result: case_data.expected_result,
            test_data_id: case_data.test_data_id,
        };
        tran.execute(
            "INSERT INTO test_cases (id, arguments, expected_result, test_data_id) \
             VALUES ($1, $2, $3, $4)",
            &[
                &case.id,
                &case.arguments,
                &case.expected_result,
                &case.test_data_id,
            ],
        )
        .await?;
        tran.commit().await?;
        Ok(case)
    }

    async fn test_cases_of_data(&self, test_data_id: TestDataId) -> Result<Vec<TestCase>> {
        let rows = self
            .conn()
            .await?
            .query(
                "SELECT * FROM test_cases WHERE test_data_id = $1",
                &[&test_data_id],
            )
            .await?;
        Ok(rows.into_iter().map(TestCase::from_pg_row).collect())
    }
}

impl Repo for PgRepo {}
