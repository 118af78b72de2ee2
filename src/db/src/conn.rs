use crate::{error::Result, schema::*};

/// Facade over the configured backends. Operations go to postgres when it
/// is configured and fall back to the in-memory store otherwise.
#[derive(Debug)]
pub struct DbConn {
    pub(crate) mem: crate::repo::MemoryRepo,
    pub(crate) pg: Option<crate::repo::PgRepo>,
}

impl DbConn {
    fn users_repo(&self) -> &dyn crate::repo::UsersRepo {
        if let Some(pg) = &self.pg {
            return &*pg;
        }
        &self.mem
    }

    fn tasks_repo(&self) -> &dyn crate::repo::TasksRepo {
        if let Some(pg) = &self.pg {
            return &*pg;
        }
        &self.mem
    }

    fn solutions_repo(&self) -> &dyn crate::repo::SolutionsRepo {
        if let Some(pg) = &self.pg {
            return &*pg;
        }
        &self.mem
    }

    fn tags_repo(&self) -> &dyn crate::repo::TagsRepo {
        if let Some(pg) = &self.pg {
            return &*pg;
        }
        &self.mem
    }

    fn votes_repo(&self) -> &dyn crate::repo::VotesRepo {
        if let Some(pg) = &self.pg {
            return &*pg;
        }
        &self.mem
    }

    fn tests_repo(&self) -> &dyn crate::repo::TestsRepo {
        if let Some(pg) = &self.pg {
            return &*pg;
        }
        &self.mem
    }
}

impl DbConn {
    pub async fn user_new(&self, user_data: NewUser) -> Result<User> {
        self.users_repo().user_new(user_data).await
    }

    pub async fn user_try_load(&self, user_id: UserId) -> Result<Option<User>> {
        self.users_repo().user_try_load(user_id).await
    }

    pub async fn user_load(&self, user_id: UserId) -> Result<User> {
        self.users_repo().user_load(user_id).await
    }

    pub async fn user_try_load_by_nickname(&self, nickname: &str) -> Result<Option<User>> {
        self.users_repo().user_try_load_by_nickname(nickname).await
    }

    pub async fn user_update(&self, user_id: UserId, patch: UserPatch) -> Result<()> {
        self.users_repo().user_update(user_id, patch).await
    }

    pub async fn user_delete(&self, user_id: UserId) -> Result<()> {
        self.users_repo().user_delete(user_id).await
    }

    pub async fn user_select(&self, limit: Option<u32>) -> Result<Vec<User>> {
        self.users_repo().user_select(limit).await
    }

    pub async fn profile_image_new(&self, image_data: NewProfileImage) -> Result<ProfileImage> {
        self.users_repo().profile_image_new(image_data).await
    }

    pub async fn profile_image_try_load_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<ProfileImage>> {
        self.users_repo()
            .profile_image_try_load_by_user(user_id)
            .await
    }

    pub async fn profile_image_delete(&self, image_id: ImageId) -> Result<()> {
        self.users_repo().profile_image_delete(image_id).await
    }

    pub async fn task_new(&self, task_data: NewTask) -> Result<Task> {
        self.tasks_repo().task_new(task_data).await
    }

    pub async fn task_try_load(&self, task_id: TaskId) -> Result<Option<Task>> {
        self.tasks_repo().task_try_load(task_id).await
    }

    pub async fn task_load(&self, task_id: TaskId) -> Result<Task> {
        self.tasks_repo().task_load(task_id).await
    }

    pub async fn task_update(&self, task_id: TaskId, patch: TaskPatch) -> Result<()> {
        self.tasks_repo().task_update(task_id, patch).await
    }

    pub async fn task_delete(&self, task_id: TaskId) -> Result<()> {
        self.tasks_repo().task_delete(task_id).await
    }

    pub async fn task_select(
        &self,
        author_id: Option<UserId>,
        limit: Option<u32>,
    ) -> Result<Vec<Task>> {
        self.tasks_repo().task_select(author_id, limit).await
    }

    pub async fn task_description_new(
        &self,
        description_data: NewTaskDescription,
    ) -> Result<TaskDescription> {
        self.tasks_repo().task_description_new(description_data).await
    }

    pub async fn task_description_try_load_by_task(
        &self,
        task_id: TaskId,
    ) -> Result<Option<TaskDescription>> {
        self.tasks_repo()
            .task_description_try_load_by_task(task_id)
            .await
    }

    pub async fn task_description_image_new(
        &self,
        image_data: NewTaskDescriptionImage,
    ) -> Result<TaskDescriptionImage> {
        self.tasks_repo().task_description_image_new(image_data).await
    }

    pub async fn task_description_images(
        &self,
        description_id: DescriptionId,
    ) -> Result<Vec<TaskDescriptionImage>> {
        self.tasks_repo().task_description_images(description_id).await
    }

    pub async fn hint_new(&self, hint_data: NewHint) -> Result<Hint> {
        self.tasks_repo().hint_new(hint_data).await
    }

    pub async fn hints_of_task(&self, task_id: TaskId) -> Result<Vec<Hint>> {
        self.tasks_repo().hints_of_task(task_id).await
    }

    pub async fn hint_delete(&self, hint_id: HintId) -> Result<()> {
        self.tasks_repo().hint_delete(hint_id).await
    }

    pub async fn solution_new(&self, solution_data: NewSolution) -> Result<Solution> {
        self.solutions_repo().solution_new(solution_data).await
    }

    pub async fn solution_try_load(&self, solution_id: SolutionId) -> Result<Option<Solution>> {
        self.solutions_repo().solution_try_load(solution_id).await
    }

    pub async fn solution_load(&self, solution_id: SolutionId) -> Result<Solution> {
        self.solutions_repo().solution_load(solution_id).await
    }

    pub async fn solution_update(
        &self,
        solution_id: SolutionId,
        patch: SolutionPatch,
    ) -> Result<()> {
        self.solutions_repo().solution_update(solution_id, patch).await
    }

    pub async fn solution_delete(&self, solution_id: SolutionId) -> Result<()> {
        self.solutions_repo().solution_delete(solution_id).await
    }

    pub async fn solutions_of_task(&self, task_id: TaskId) -> Result<Vec<Solution>> {
        self.solutions_repo().solutions_of_task(task_id).await
    }

    pub async fn solution_select(
        &self,
        author_id: Option<UserId>,
        limit: Option<u32>,
    ) -> Result<Vec<Solution>> {
        self.solutions_repo().solution_select(author_id, limit).await
    }

    pub async fn solution_description_new(
        &self,
        description_data: NewSolutionDescription,
    ) -> Result<SolutionDescription> {
        self.solutions_repo()
            .solution_description_new(description_data)
            .await
    }

    pub async fn solution_description_try_load_by_solution(
        &self,
        solution_id: SolutionId,
    ) -> Result<Option<SolutionDescription>> {
        self.solutions_repo()
            .solution_description_try_load_by_solution(solution_id)
            .await
    }

    pub async fn solution_description_image_new(
        &self,
        image_data: NewSolutionDescriptionImage,
    ) -> Result<SolutionDescriptionImage> {
        self.solutions_repo()
            .solution_description_image_new(image_data)
            .await
    }

    pub async fn solution_description_images(
        &self,
        description_id: DescriptionId,
    ) -> Result<Vec<SolutionDescriptionImage>> {
        self.solutions_repo()
            .solution_description_images(description_id)
            .await
    }

    pub async fn tag_new(&self, tag_data: NewTag) -> Result<Tag> {
        self.tags_repo().tag_new(tag_data).await
    }

    pub async fn tag_try_load(&self, tag_id: TagId) -> Result<Option<Tag>> {
        self.tags_repo().tag_try_load(tag_id).await
    }

    pub async fn tag_try_load_by_text(&self, text: &str) -> Result<Option<Tag>> {
        self.tags_repo().tag_try_load_by_text(text).await
    }

    pub async fn tag_select(&self) -> Result<Vec<Tag>> {
        self.tags_repo().tag_select().await
    }

    pub async fn tag_delete(&self, tag_id: TagId) -> Result<()> {
        self.tags_repo().tag_delete(tag_id).await
    }

    pub async fn tag_attach(&self, task_id: TaskId, tag_id: TagId) -> Result<()> {
        self.tags_repo().tag_attach(task_id, tag_id).await
    }

    pub async fn tag_detach(&self, task_id: TaskId, tag_id: TagId) -> Result<()> {
        self.tags_repo().tag_detach(task_id, tag_id).await
    }

    pub async fn tags_of_task(&self, task_id: TaskId) -> Result<Vec<Tag>> {
        self.tags_repo().tags_of_task(task_id).await
    }

    pub async fn tasks_with_tag(&self, tag_id: TagId) -> Result<Vec<TaskId>> {
        self.tags_repo().tasks_with_tag(tag_id).await
    }

    pub async fn task_vote_cast(&self, vote_data: NewTaskVote) -> Result<TaskVote> {
        self.votes_repo().task_vote_cast(vote_data).await
    }

    pub async fn task_vote_try_load(&self, vote_id: VoteId) -> Result<Option<TaskVote>> {
        self.votes_repo().task_vote_try_load(vote_id).await
    }

    pub async fn task_vote_update(&self, vote_id: VoteId, stars_count: i16) -> Result<()> {
        self.votes_repo().task_vote_update(vote_id, stars_count).await
    }

    pub async fn task_vote_delete(&self, vote_id: VoteId) -> Result<()> {
        self.votes_repo().task_vote_delete(vote_id).await
    }

    pub async fn task_votes_of_task(&self, task_id: TaskId) -> Result<Vec<TaskVote>> {
        self.votes_repo().task_votes_of_task(task_id).await
    }

    pub async fn solution_vote_cast(&self, vote_data: NewSolutionVote) -> Result<SolutionVote> {
        self.votes_repo().solution_vote_cast(vote_data).await
    }

    pub async fn solution_vote_try_load(&self, vote_id: VoteId) -> Result<Option<SolutionVote>> {
        self.votes_repo().solution_vote_try_load(vote_id).await
    }

    pub async fn solution_vote_update(&self, vote_id: VoteId, stars_count: i16) -> Result<()> {
        self.votes_repo()
            .solution_vote_update(vote_id, stars_count)
            .await
    }

    pub async fn solution_vote_delete(&self, vote_id: VoteId) -> Result<()> {
        self.votes_repo().solution_vote_delete(vote_id).await
    }

    pub async fn solution_votes_of_solution(
        &self,
        solution_id: SolutionId,
    ) -> Result<Vec<SolutionVote>> {
        self.votes_repo().solution_votes_of_solution(solution_id).await
    }

    pub async fn test_data_new(&self, data: NewTestData) -> Result<TestData> {
        self.tests_repo().test_data_new(data).await
    }

    pub async fn test_data_try_load_by_task(&self, task_id: TaskId) -> Result<Option<TestData>> {
        self.tests_repo().test_data_try_load_by_task(task_id).await
    }

    pub async fn test_data_delete(&self, test_data_id: TestDataId) -> Result<()> {
        self.tests_repo().test_data_delete(test_data_id).await
    }

    pub async fn test_case_new(&self, case_data: NewTestCase) -> Result<TestCase> {
        self.tests_repo().test_case_new(case_data).await
    }

    pub async fn test_cases_of_data(&self, test_data_id: TestDataId) -> Result<Vec<TestCase>> {
        self.tests_repo().test_cases_of_data(test_data_id).await
    }
}
