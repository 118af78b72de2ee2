mod description;
mod hint;
mod image;
mod solution;
mod tag;
mod task;
mod test_data;
mod user;
mod vote;

pub use task::DifficultyLevel;
pub use user::Role;
pub use vote::{MAX_STARS, MIN_STARS};

pub(crate) use vote::check_stars;

use serde::{Deserialize, Serialize};

pub type UserId = uuid::Uuid;
pub type TaskId = uuid::Uuid;
pub type SolutionId = uuid::Uuid;
pub type DescriptionId = uuid::Uuid;
pub type ImageId = uuid::Uuid;
pub type TagId = uuid::Uuid;
pub type HintId = uuid::Uuid;
pub type VoteId = uuid::Uuid;
pub type TestDataId = uuid::Uuid;
pub type TestCaseId = uuid::Uuid;

/// Columns shared by both description tables.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptionFields {
    pub text: String,
    /// Order of the links is significant and preserved.
    pub links: Vec<String>,
}

/// Columns shared by all three image tables. Content is an opaque byte
/// sequence, never interpreted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ImageFields {
    pub name: String,
    pub content: Vec<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub full_name: Option<String>,
    pub nickname: String,
    pub email: Option<String>,
    pub password: String,
    pub about: Option<String>,
    pub join_date: chrono::NaiveDateTime,
    pub last_login: chrono::NaiveDateTime,
    /// Stars currently standing on tasks this user authored.
    pub task_stars_received: i32,
    /// Stars currently standing on solutions this user authored.
    pub solution_stars_received: i32,
    pub(crate) role: i16,
}

pub struct NewUser {
    pub full_name: Option<String>,
    pub nickname: String,
    pub email: Option<String>,
    pub password: String,
    pub about: Option<String>,
    pub role: Role,
}

#[derive(Default)]
pub struct UserPatch {
    pub(crate) full_name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) about: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) last_login: Option<chrono::NaiveDateTime>,
    pub(crate) role: Option<i16>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProfileImage {
    pub id: ImageId,
    pub user_id: UserId,
    pub fields: ImageFields,
    pub upload_date: chrono::NaiveDateTime,
}

pub struct NewProfileImage {
    pub user_id: UserId,
    pub fields: ImageFields,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub(crate) difficulty_level: i16,
    pub create_date: chrono::NaiveDateTime,
    pub last_modified: chrono::NaiveDateTime,
    pub author_id: UserId,
}

pub struct NewTask {
    pub name: String,
    pub difficulty_level: DifficultyLevel,
    pub author_id: UserId,
}

#[derive(Default)]
pub struct TaskPatch {
    pub(crate) name: Option<String>,
    pub(crate) difficulty_level: Option<i16>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TaskDescription {
    pub id: DescriptionId,
    pub task_id: TaskId,
    pub fields: DescriptionFields,
}

pub struct NewTaskDescription {
    pub task_id: TaskId,
    pub fields: DescriptionFields,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TaskDescriptionImage {
    pub id: ImageId,
    pub task_description_id: DescriptionId,
    pub fields: ImageFields,
    pub upload_date: chrono::NaiveDateTime,
}

pub struct NewTaskDescriptionImage {
    pub task_description_id: DescriptionId,
    pub fields: ImageFields,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub id: SolutionId,
    pub name: String,
    pub task_id: TaskId,
    pub author_id: UserId,
    pub content: String,
    pub create_date: chrono::NaiveDateTime,
    pub last_modified: chrono::NaiveDateTime,
}

pub struct NewSolution {
    pub name: String,
    pub task_id: TaskId,
    pub author_id: UserId,
    pub content: String,
}

#[derive(Default)]
pub struct SolutionPatch {
    pub(crate) name: Option<String>,
    pub(crate) content: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SolutionDescription {
    pub id: DescriptionId,
    pub solution_id: SolutionId,
    pub fields: DescriptionFields,
}

pub struct NewSolutionDescription {
    pub solution_id: SolutionId,
    pub fields: DescriptionFields,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SolutionDescriptionImage {
    pub id: ImageId,
    pub solution_description_id: DescriptionId,
    pub fields: ImageFields,
    pub upload_date: chrono::NaiveDateTime,
}

pub struct NewSolutionDescriptionImage {
    pub solution_description_id: DescriptionId,
    pub fields: ImageFields,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: TagId,
    pub text: String,
}

pub struct NewTag {
    pub text: String,
}

/// Row of the `tasks_tags` association table. Not an ownership edge: tags
/// outlive the tasks they are attached to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTag {
    pub task_id: TaskId,
    pub tag_id: TagId,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hint {
    pub id: HintId,
    pub task_id: TaskId,
}

pub struct NewHint {
    pub task_id: TaskId,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskVote {
    pub id: VoteId,
    pub task_id: TaskId,
    pub user_id: UserId,
    pub stars_count: i16,
}

pub struct NewTaskVote {
    pub task_id: TaskId,
    pub user_id: UserId,
    pub stars_count: i16,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolutionVote {
    pub id: VoteId,
    pub solution_id: SolutionId,
    pub user_id: UserId,
    pub stars_count: i16,
}

pub struct NewSolutionVote {
    pub solution_id: SolutionId,
    pub user_id: UserId,
    pub stars_count: i16,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestData {
    pub id: TestDataId,
    pub task_id: TaskId,
}

pub struct NewTestData {
    pub task_id: TaskId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub id: TestCaseId,
    pub arguments: Option<String>,
    pub expected_result: Option<String>,
    pub test_data_id: TestDataId,
}

pub struct NewTestCase {
    pub test_data_id: TestDataId,
    pub arguments: Option<String>,
    pub expected_result: Option<String>,
}
