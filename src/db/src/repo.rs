mod memory;
mod pg;

pub use memory::MemoryRepo;
pub use pg::PgRepo;

use crate::{
    error::{Error, Result},
    schema::*,
};
use async_trait::async_trait;

#[async_trait]
pub trait UsersRepo: std::fmt::Debug + Send + Sync {
    async fn user_new(&self, user_data: NewUser) -> Result<User>;
    async fn user_try_load(&self, user_id: UserId) -> Result<Option<User>>;
    async fn user_load(&self, user_id: UserId) -> Result<User> {
        match self.user_try_load(user_id).await? {
            Some(user) => Ok(user),
            None => Err(Error::NotFound {
                table: "users",
                id: user_id,
            }),
        }
    }
    async fn user_try_load_by_nickname(&self, nickname: &str) -> Result<Option<User>>;
    async fn user_update(&self, user_id: UserId, patch: UserPatch) -> Result<()>;
    /// Deletes the user together with everything they own: profile image,
    /// cast votes, authored solutions and authored tasks (with their whole
    /// subtrees). Atomic.
    async fn user_delete(&self, user_id: UserId) -> Result<()>;
    async fn user_select(&self, limit: Option<u32>) -> Result<Vec<User>>;

    async fn profile_image_new(&self, image_data: NewProfileImage) -> Result<ProfileImage>;
    async fn profile_image_try_load_by_user(&self, user_id: UserId)
        -> Result<Option<ProfileImage>>;
    async fn profile_image_delete(&self, image_id: ImageId) -> Result<()>;
}

#[async_trait]
pub trait TasksRepo: Send + Sync {
    async fn task_new(&self, task_data: NewTask) -> Result<Task>;
    async fn task_try_load(&self, task_id: TaskId) -> Result<Option<Task>>;
    async fn task_load(&self, task_id: TaskId) -> Result<Task> {
        match self.task_try_load(task_id).await? {
            Some(task) => Ok(task),
            None => Err(Error::NotFound {
                table: "tasks",
                id: task_id,
            }),
        }
    }
    /// Bumps `last_modified`.
    async fn task_update(&self, task_id: TaskId, patch: TaskPatch) -> Result<()>;
    /// Deletes the task and its whole owned subtree (description, images,
    /// solutions, hints, votes, test data) and unlinks its tags. Atomic.
    async fn task_delete(&self, task_id: TaskId) -> Result<()>;
    async fn task_select(&self, author_id: Option<UserId>, limit: Option<u32>)
        -> Result<Vec<Task>>;

    async fn task_description_new(
        &self,
        description_data: NewTaskDescription,
    ) -> Result<TaskDescription>;
    async fn task_description_try_load_by_task(
        &self,
        task_id: TaskId,
    ) -> Result<Option<TaskDescription>>;

    async fn task_description_image_new(
        &self,
        image_data: NewTaskDescriptionImage,
    ) -> Result<TaskDescriptionImage>;
    async fn task_description_images(
        &self,
        description_id: DescriptionId,
    ) -> Result<Vec<TaskDescriptionImage>>;

    async fn hint_new(&self, hint_data: NewHint) -> Result<Hint>;
    async fn hints_of_task(&self, task_id: TaskId) -> Result<Vec<Hint>>;
    async fn hint_delete(&self, hint_id: HintId) -> Result<()>;
}

#[async_trait]
pub trait SolutionsRepo: Send + Sync {
    async fn solution_new(&self, solution_data: NewSolution) -> Result<Solution>;
    async fn solution_try_load(&self, solution_id: SolutionId) -> Result<Option<Solution>>;
    async fn solution_load(&self, solution_id: SolutionId) -> Result<Solution> {
        match self.solution_try_load(solution_id).await? {
            Some(solution) => Ok(solution),
            None => Err(Error::NotFound {
                table: "solutions",
                id: solution_id,
            }),
        }
    }
    /// Bumps `last_modified`.
    async fn solution_update(&self, solution_id: SolutionId, patch: SolutionPatch) -> Result<()>;
    /// Deletes the solution with its description, images and votes. Atomic.
    async fn solution_delete(&self, solution_id: SolutionId) -> Result<()>;
    async fn solutions_of_task(&self, task_id: TaskId) -> Result<Vec<Solution>>;
    async fn solution_select(
        &self,
        author_id: Option<UserId>,
        limit: Option<u32>,
    ) -> Result<Vec<Solution>>;

    async fn solution_description_new(
        &self,
        description_data: NewSolutionDescription,
    ) -> Result<SolutionDescription>;
    async fn solution_description_try_load_by_solution(
        &self,
        solution_id: SolutionId,
    ) -> Result<Option<SolutionDescription>>;

    async fn solution_description_image_new(
        &self,
        image_data: NewSolutionDescriptionImage,
    ) -> Result<SolutionDescriptionImage>;
    async fn solution_description_images(
        &self,
        description_id: DescriptionId,
    ) -> Result<Vec<SolutionDescriptionImage>>;
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    async fn tag_new(&self, tag_data: NewTag) -> Result<Tag>;
    async fn tag_try_load(&self, tag_id: TagId) -> Result<Option<Tag>>;
    async fn tag_try_load_by_text(&self, text: &str) -> Result<Option<Tag>>;
    async fn tag_select(&self) -> Result<Vec<Tag>>;
    /// Removes the tag and its association rows. Tasks are untouched.
    async fn tag_delete(&self, tag_id: TagId) -> Result<()>;

    /// Idempotent: attaching an already-attached tag is a no-op.
    async fn tag_attach(&self, task_id: TaskId, tag_id: TagId) -> Result<()>;
    async fn tag_detach(&self, task_id: TaskId, tag_id: TagId) -> Result<()>;
    async fn tags_of_task(&self, task_id: TaskId) -> Result<Vec<Tag>>;
    async fn tasks_with_tag(&self, tag_id: TagId) -> Result<Vec<TaskId>>;
}

#[async_trait]
pub trait VotesRepo: Send + Sync {
    /// One vote per (task, user); a second cast is a validation error.
    async fn task_vote_cast(&self, vote_data: NewTaskVote) -> Result<TaskVote>;
    async fn task_vote_try_load(&self, vote_id: VoteId) -> Result<Option<TaskVote>>;
    async fn task_vote_update(&self, vote_id: VoteId, stars_count: i16) -> Result<()>;
    async fn task_vote_delete(&self, vote_id: VoteId) -> Result<()>;
    async fn task_votes_of_task(&self, task_id: TaskId) -> Result<Vec<TaskVote>>;

    async fn solution_vote_cast(&self, vote_data: NewSolutionVote) -> Result<SolutionVote>;
    async fn solution_vote_try_load(&self, vote_id: VoteId) -> Result<Option<SolutionVote>>;
    async fn solution_vote_update(&self, vote_id: VoteId, stars_count: i16) -> Result<()>;
    async fn solution_vote_delete(&self, vote_id: VoteId) -> Result<()>;
    async fn solution_votes_of_solution(
        &self,
        solution_id: SolutionId,
    ) -> Result<Vec<SolutionVote>>;
}

#[async_trait]
pub trait TestsRepo: Send + Sync {
    /// At most one test data row per task.
    async fn test_data_new(&self, data: NewTestData) -> Result<TestData>;
    async fn test_data_try_load_by_task(&self, task_id: TaskId) -> Result<Option<TestData>>;
    /// Deletes the row and its test cases. Atomic.
    async fn test_data_delete(&self, test_data_id: TestDataId) -> Result<()>;

    async fn test_case_new(&self, case_data: NewTestCase) -> Result<TestCase>;
    async fn test_cases_of_data(&self, test_data_id: TestDataId) -> Result<Vec<TestCase>>;
}

pub trait Repo: UsersRepo + TasksRepo + SolutionsRepo + TagsRepo + VotesRepo + TestsRepo {}
