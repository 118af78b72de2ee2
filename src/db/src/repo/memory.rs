use super::{Repo, SolutionsRepo, TagsRepo, TasksRepo, TestsRepo, UsersRepo, VotesRepo};
use crate::{
    error::{Error, Result},
    schema::*,
};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

#[derive(Debug, Default)]
struct Data {
    users: HashMap<UserId, User>,
    profile_images: HashMap<ImageId, ProfileImage>,
    tasks: HashMap<TaskId, Task>,
    task_descriptions: HashMap<DescriptionId, TaskDescription>,
    task_description_images: HashMap<ImageId, TaskDescriptionImage>,
    solutions: HashMap<SolutionId, Solution>,
    solution_descriptions: HashMap<DescriptionId, SolutionDescription>,
    solution_description_images: HashMap<ImageId, SolutionDescriptionImage>,
    tags: HashMap<TagId, Tag>,
    tasks_tags: Vec<TaskTag>,
    hints: HashMap<HintId, Hint>,
    task_votes: HashMap<VoteId, TaskVote>,
    solution_votes: HashMap<VoteId, SolutionVote>,
    test_data: HashMap<TestDataId, TestData>,
    test_cases: HashMap<TestCaseId, TestCase>,
}

impl Data {
    fn check_user(&self, user_id: UserId) -> Result<()> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(Error::MissingParent {
                table: "users",
                id: user_id,
            })
        }
    }

    fn check_task(&self, task_id: TaskId) -> Result<()> {
        if self.tasks.contains_key(&task_id) {
            Ok(())
        } else {
            Err(Error::MissingParent {
                table: "tasks",
                id: task_id,
            })
        }
    }

    fn sub_task_stars(&mut self, author_id: UserId, amount: i32) {
        if let Some(author) = self.users.get_mut(&author_id) {
            author.task_stars_received -= amount;
        }
    }

    fn sub_solution_stars(&mut self, author_id: UserId, amount: i32) {
        if let Some(author) = self.users.get_mut(&author_id) {
            author.solution_stars_received -= amount;
        }
    }

    // Cascade procedures. Each runs to completion under the single data
    // lock, children before parent, so no observer can see an orphan.

    fn purge_solution(&mut self, solution_id: SolutionId) {
        let author_id = match self.solutions.get(&solution_id) {
            Some(solution) => solution.author_id,
            None => return,
        };
        let stars: i32 = self
            .solution_votes
            .values()
            .filter(|vote| vote.solution_id == solution_id)
            .map(|vote| i32::from(vote.stars_count))
            .sum();
        self.sub_solution_stars(author_id, stars);
        self.solution_votes
            .retain(|_, vote| vote.solution_id != solution_id);
        let descriptions: Vec<DescriptionId> = self
            .solution_descriptions
            .values()
            .filter(|description| description.solution_id == solution_id)
            .map(|description| description.id)
            .collect();
        self.solution_description_images
            .retain(|_, image| !descriptions.contains(&image.solution_description_id));
        self.solution_descriptions
            .retain(|_, description| description.solution_id != solution_id);
        self.solutions.remove(&solution_id);
    }

    fn purge_task(&mut self, task_id: TaskId) {
        let author_id = match self.tasks.get(&task_id) {
            Some(task) => task.author_id,
            None => return,
        };
        let stars: i32 = self
            .task_votes
            .values()
            .filter(|vote| vote.task_id == task_id)
            .map(|vote| i32::from(vote.stars_count))
            .sum();
        self.sub_task_stars(author_id, stars);
        self.task_votes.retain(|_, vote| vote.task_id != task_id);
        let solutions: Vec<SolutionId> = self
            .solutions
            .values()
            .filter(|solution| solution.task_id == task_id)
            .map(|solution| solution.id)
            .collect();
        for solution_id in solutions {
            self.purge_solution(solution_id);
        }
        let data_ids: Vec<TestDataId> = self
            .test_data
            .values()
            .filter(|data| data.task_id == task_id)
            .map(|data| data.id)
            .collect();
        self.test_cases
            .retain(|_, case| !data_ids.contains(&case.test_data_id));
        self.test_data.retain(|_, data| data.task_id != task_id);
        self.hints.retain(|_, hint| hint.task_id != task_id);
        let descriptions: Vec<DescriptionId> = self
            .task_descriptions
            .values()
            .filter(|description| description.task_id == task_id)
            .map(|description| description.id)
            .collect();
        self.task_description_images
            .retain(|_, image| !descriptions.contains(&image.task_description_id));
        self.task_descriptions
            .retain(|_, description| description.task_id != task_id);
        // association rows only; the tags themselves survive
        self.tasks_tags.retain(|link| link.task_id != task_id);
        self.tasks.remove(&task_id);
    }

    fn purge_user(&mut self, user_id: UserId) {
        // votes the user cast: give the stars back to the content authors
        let cast_task_votes: Vec<TaskVote> = self
            .task_votes
            .values()
            .filter(|vote| vote.user_id == user_id)
            .copied()
            .collect();
        for vote in cast_task_votes {
            if let Some(author_id) = self.tasks.get(&vote.task_id).map(|task| task.author_id) {
                self.sub_task_stars(author_id, i32::from(vote.stars_count));
            }
            self.task_votes.remove(&vote.id);
        }
        let cast_solution_votes: Vec<SolutionVote> = self
            .solution_votes
            .values()
            .filter(|vote| vote.user_id == user_id)
            .copied()
            .collect();
        for vote in cast_solution_votes {
            if let Some(author_id) = self
                .solutions
                .get(&vote.solution_id)
                .map(|solution| solution.author_id)
            {
                self.sub_solution_stars(author_id, i32::from(vote.stars_count));
            }
            self.solution_votes.remove(&vote.id);
        }
        // authored solutions (including ones on other users' tasks)
        let solutions: Vec<SolutionId> = self
            .solutions
            .values()
            .filter(|solution| solution.author_id == user_id)
            .map(|solution| solution.id)
            .collect();
        for solution_id in solutions {
            self.purge_solution(solution_id);
        }
        // authored tasks with their whole subtrees
        let tasks: Vec<TaskId> = self
            .tasks
            .values()
            .filter(|task| task.author_id == user_id)
            .map(|task| task.id)
            .collect();
        for task_id in tasks {
            self.purge_task(task_id);
        }
        self.profile_images
            .retain(|_, image| image.user_id != user_id);
        self.users.remove(&user_id);
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryRepo {
    conn: Arc<Mutex<Data>>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsersRepo for MemoryRepo {
    async fn user_new(&self, user_data: NewUser) -> Result<User> {
        user_data.validate()?;
        let mut data = self.conn.lock().unwrap();
        if data
            .users
            .values()
            .any(|user| user.nickname == user_data.nickname)
        {
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
        data.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_try_load(&self, user_id: UserId) -> Result<Option<User>> {
        let data = self.conn.lock().unwrap();
        Ok(data.users.get(&user_id).cloned())
    }

    async fn user_try_load_by_nickname(&self, nickname: &str) -> Result<Option<User>> {
        let data = self.conn.lock().unwrap();
        Ok(data
            .users
            .values()
            .find(|user| user.nickname == nickname)
            .cloned())
    }

    async fn user_update(&self, user_id: UserId, patch: UserPatch) -> Result<()> {
        patch.validate()?;
        let mut data = self.conn.lock().unwrap();
        let user = match data.users.get_mut(&user_id) {
            Some(user) => user,
            None => {
                return Err(Error::NotFound {
                    table: "users",
                    id: user_id,
                })
            }
        };
        if let Some(full_name) = patch.full_name {
            user.full_name = Some(full_name);
        }
        if let Some(email) = patch.email {
            user.email = Some(email);
        }
        if let Some(about) = patch.about {
            user.about = Some(about);
        }
        if let Some(password) = patch.password {
            user.password = password;
        }
        if let Some(last_login) = patch.last_login {
            user.last_login = last_login;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        Ok(())
    }

    async fn user_delete(&self, user_id: UserId) -> Result<()> {
        let mut data = self.conn.lock().unwrap();
        if !data.users.contains_key(&user_id) {
            return Err(Error::NotFound {
                table: "users",
                id: user_id,
            });
        }
        data.purge_user(user_id);
        Ok(())
    }

    async fn user_select(&self, limit: Option<u32>) -> Result<Vec<User>> {
        let data = self.conn.lock().unwrap();
        let limit = limit.map(|x| x as usize).unwrap_or(usize::max_value());
        Ok(data.users.values().take(limit).cloned().collect())
    }

    async fn profile_image_new(&self, image_data: NewProfileImage) -> Result<ProfileImage> {
        image_data.validate()?;
        let mut data = self.conn.lock().unwrap();
        data.check_user(image_data.user_id)?;
        if data
            .profile_images
            .values()
            .any(|image| image.user_id == image_data.user_id)
        {
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
        data.profile_images.insert(image.id, image.clone());
        Ok(image)
    }

    async fn profile_image_try_load_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<ProfileImage>> {
        let data = self.conn.lock().unwrap();
        Ok(data
            .profile_images
            .values()
            .find(|image| image.user_id == user_id)
            .cloned())
    }

    async fn profile_image_delete(&self, image_id: ImageId) -> Result<()> {
        let mut data = self.conn.lock().unwrap();
        match data.profile_images.remove(&image_id) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound {
                table: "profile_images",
                id: image_id,
            }),
        }
    }
}

#[async_trait]
impl TasksRepo for MemoryRepo {
    async fn task_new(&self, task_data: NewTask) -> Result<Task> {
        task_data.validate()?;
        let mut data = self.conn.lock().unwrap();
        data.check_user(task_data.author_id)?;
        let now = crate::now();
        let task = Task {
            id: uuid::Uuid::new_v4(),
            name: task_data.name,
            difficulty_level: task_data.difficulty_level.into(),
            create_date: now,
            last_modified: now,
            author_id: task_data.author_id,
        };
        data.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn task_try_load(&self, task_id: TaskId) -> Result<Option<Task>> {
        let data = self.conn.lock().unwrap();
        Ok(data.tasks.get(&task_id).cloned())
    }

    async fn task_update(&self, task_id: TaskId, patch: TaskPatch) -> Result<()> {
        patch.validate()?;
        let mut data = self.conn.lock().unwrap();
        let task = match data.tasks.get_mut(&task_id) {
            Some(task) => task,
            None => {
                return Err(Error::NotFound {
                    table: "tasks",
                    id: task_id,
                })
            }
        };
        if let Some(name) = patch.name {
            task.name = name;
        }
        if let Some(difficulty_level) = patch.difficulty_level {
            task.difficulty_level = difficulty_level;
        }
        task.last_modified = crate::now();
        Ok(())
    }

    async fn task_delete(&self, task_id: TaskId) -> Result<()> {
        let mut data = self.conn.lock().unwrap();
        if !data.tasks.contains_key(&task_id) {
            return Err(Error::NotFound {
                table: "tasks",
                id: task_id,
            });
        }
        data.purge_task(task_id);
        Ok(())
    }

    async fn task_select(
        &self,
        author_id: Option<UserId>,
        limit: Option<u32>,
    ) -> Result<Vec<Task>> {
        let data = self.conn.lock().unwrap();
        let limit = limit.map(|x| x as usize).unwrap_or(usize::max_value());
        Ok(data
            .tasks
            .values()
            .filter(|task| match author_id {
                Some(author_id) => task.author_id == author_id,
                None => true,
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn task_description_new(
        &self,
        description_data: NewTaskDescription,
    ) -> Result<TaskDescription> {
        description_data.validate()?;
        let mut data = self.conn.lock().unwrap();
        data.check_task(description_data.task_id)?;
        if data
            .task_descriptions
            .values()
            .any(|description| description.task_id == description_data.task_id)
        {
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
        data.task_descriptions
            .insert(description.id, description.clone());
        Ok(description)
    }

    async fn task_description_try_load_by_task(
        &self,
        task_id: TaskId,
    ) -> Result<Option<TaskDescription>> {
        let data = self.conn.lock().unwrap();
        Ok(data
            .task_descriptions
            .values()
            .find(|description| description.task_id == task_id)
            .cloned())
    }

    async fn task_description_image_new(
        &self,
        image_data: NewTaskDescriptionImage,
    ) -> Result<TaskDescriptionImage> {
        image_data.validate()?;
        let mut data = self.conn.lock().unwrap();
        if !data
            .task_descriptions
            .contains_key(&image_data.task_description_id)
        {
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
        data.task_description_images.insert(image.id, image.clone());
        Ok(image)
    }

    async fn task_description_images(
        &self,
        description_id: DescriptionId,
    ) -> Result<Vec<TaskDescriptionImage>> {
        let data = self.conn.lock().unwrap();
        Ok(data
            .task_description_images
            .values()
            .filter(|image| image.task_description_id == description_id)
            .cloned()
            .collect())
    }

    async fn hint_new(&self, hint_data: NewHint) -> Result<Hint> {
        let mut data = self.conn.lock().unwrap();
        data.check_task(hint_data.task_id)?;
        let hint = Hint {
            id: uuid::Uuid::new_v4(),
            task_id: hint_data.task_id,
        };
        data.hints.insert(hint.id, hint);
        Ok(hint)
    }

    async fn hints_of_task(&self, task_id: TaskId) -> Result<Vec<Hint>> {
        let data = self.conn.lock().unwrap();
        Ok(data
            .hints
            .values()
            .filter(|hint| hint.task_id == task_id)
            .copied()
            .collect())
    }

    async fn hint_delete(&self, hint_id: HintId) -> Result<()> {
        let mut data = self.conn.lock().unwrap();
        match data.hints.remove(&hint_id) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound {
                table: "hints",
                id: hint_id,
            }),
        }
    }
}

#[async_trait]
impl SolutionsRepo for MemoryRepo {
    async fn solution_new(&self, solution_data: NewSolution) -> Result<Solution> {
        solution_data.validate()?;
        let mut data = self.conn.lock().unwrap();
        data.check_task(solution_data.task_id)?;
        data.check_user(solution_data.author_id)?;
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
        data.solutions.insert(solution.id, solution.clone());
        Ok(solution)
    }

    async fn solution_try_load(&self, solution_id: SolutionId) -> Result<Option<Solution>> {
        let data = self.conn.lock().unwrap();
        Ok(data.solutions.get(&solution_id).cloned())
    }

    async fn solution_update(&self, solution_id: SolutionId, patch: SolutionPatch) -> Result<()> {
        patch.validate()?;
        let mut data = self.conn.lock().unwrap();
        let solution = match data.solutions.get_mut(&solution_id) {
            Some(solution) => solution,
            None => {
                return Err(Error::NotFound {
                    table: "solutions",
                    id: solution_id,
                })
            }
        };
        if let Some(name) = patch.name {
            solution.name = name;
        }
        if let Some(content) = patch.content {
            solution.content = content;
        }
        solution.last_modified = crate::now();
        Ok(())
    }

    async fn solution_delete(&self, solution_id: SolutionId) -> Result<()> {
        let mut data = self.conn.lock().unwrap();
        if !data.solutions.contains_key(&solution_id) {
            return Err(Error::NotFound {
                table: "solutions",
                id: solution_id,
            });
        }
        data.purge_solution(solution_id);
        Ok(())
    }

    async fn solutions_of_task(&self, task_id: TaskId) -> Result<Vec<Solution>> {
        let data = self.conn.lock().unwrap();
        Ok(data
            .solutions
            .values()
            .filter(|solution| solution.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn solution_select(
        &self,
        author_id: Option<UserId>,
        limit: Option<u32>,
    ) -> Result<Vec<Solution>> {
        let data = self.conn.lock().unwrap();
        let limit = limit.map(|x| x as usize).unwrap_or(usize::max_value());
        Ok(data
            .solutions
            .values()
            .filter(|solution| match author_id {
                Some(author_id) => solution.author_id == author_id,
                None => true,
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn solution_description_new(
        &self,
        description_data: NewSolutionDescription,
    ) -> Result<SolutionDescription> {
        description_data.validate()?;
        let mut data = self.conn.lock().unwrap();
        if !data.solutions.contains_key(&description_data.solution_id) {
            return Err(Error::MissingParent {
                table: "solutions",
                id: description_data.solution_id,
            });
        }
        if data
            .solution_descriptions
            .values()
            .any(|description| description.solution_id == description_data.solution_id)
        {
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
        data.solution_descriptions
            .insert(description.id, description.clone());
        Ok(description)
    }

    async fn solution_description_try_load_by_solution(
        &self,
        solution_id: SolutionId,
    ) -> Result<Option<SolutionDescription>> {
        let data = self.conn.lock().unwrap();
        Ok(data
            .solution_descriptions
            .values()
            .find(|description| description.solution_id == solution_id)
            .cloned())
    }

    async fn solution_description_image_new(
        &self,
        image_data: NewSolutionDescriptionImage,
    ) -> Result<SolutionDescriptionImage> {
        image_data.validate()?;
        let mut data = self.conn.lock().unwrap();
        if !data
            .solution_descriptions
            .contains_key(&image_data.solution_description_id)
        {
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
        data.solution_description_images
            .insert(image.id, image.clone());
        Ok(image)
    }

    async fn solution_description_images(
        &self,
        description_id: DescriptionId,
    ) -> Result<Vec<SolutionDescriptionImage>> {
        let data = self.conn.lock().unwrap();
        Ok(data
            .solution_description_images
            .values()
            .filter(|image| image.solution_description_id == description_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TagsRepo for MemoryRepo {
    async fn tag_new(&self, tag_data: NewTag) -> Result<Tag> {
        tag_data.validate()?;
        let mut data = self.conn.lock().unwrap();
        if data.tags.values().any(|tag| tag.text == tag_data.text) {
            return Err(Error::validation("text", &tag_data.text, "already exists"));
        }
        let tag = Tag {
            id: uuid::Uuid::new_v4(),
            text: tag_data.text,
        };
        data.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn tag_try_load(&self, tag_id: TagId) -> Result<Option<Tag>> {
        let data = self.conn.lock().unwrap();
        Ok(data.tags.get(&tag_id).cloned())
    }

    async fn tag_try_load_by_text(&self, text: &str) -> Result<Option<Tag>> {
        let data = self.conn.lock().unwrap();
        Ok(data.tags.values().find(|tag| tag.text == text).cloned())
    }

    async fn tag_select(&self) -> Result<Vec<Tag>> {
        let data = self.conn.lock().unwrap();
        Ok(data.tags.values().cloned().collect())
    }

    async fn tag_delete(&self, tag_id: TagId) -> Result<()> {
        let mut data = self.conn.lock().unwrap();
        if data.tags.remove(&tag_id).is_none() {
            return Err(Error::NotFound {
                table: "tags",
                id: tag_id,
            });
        }
        data.tasks_tags.retain(|link| link.tag_id != tag_id);
        Ok(())
    }

    async fn tag_attach(&self, task_id: TaskId, tag_id: TagId) -> Result<()> {
        let mut data = self.conn.lock().unwrap();
        data.check_task(task_id)?;
        if !data.tags.contains_key(&tag_id) {
            return Err(Error::MissingParent {
                table: "tags",
                id: tag_id,
            });
        }
        let link = TaskTag { task_id, tag_id };
        if !data.tasks_tags.contains(&link) {
            data.tasks_tags.push(link);
        }
        Ok(())
    }

    async fn tag_detach(&self, task_id: TaskId, tag_id: TagId) -> Result<()> {
        let mut data = self.conn.lock().unwrap();
        data.tasks_tags
            .retain(|link| !(link.task_id == task_id && link.tag_id == tag_id));
        Ok(())
    }

    async fn tags_of_task(&self, task_id: TaskId) -> Result<Vec<Tag>> {
        let data = self.conn.lock().unwrap();
        Ok(data
            .tasks_tags
            .iter()
            .filter(|link| link.task_id == task_id)
            .filter_map(|link| data.tags.get(&link.tag_id))
            .cloned()
            .collect())
    }

    async fn tasks_with_tag(&self, tag_id: TagId) -> Result<Vec<TaskId>> {
        let data = self.conn.lock().unwrap();
        Ok(data
            .tasks_tags
            .iter()
            .filter(|link| link.tag_id == tag_id)
            .map(|link| link.task_id)
            .collect())
    }
}

#[async_trait]
impl VotesRepo for MemoryRepo {
    async fn task_vote_cast(&self, vote_data: NewTaskVote) -> Result<TaskVote> {
        crate::schema::check_stars(vote_data.stars_count)?;
        let mut data = self.conn.lock().unwrap();
        data.check_task(vote_data.task_id)?;
        data.check_user(vote_data.user_id)?;
        if data
            .task_votes
            .values()
            .any(|vote| vote.task_id == vote_data.task_id && vote.user_id == vote_data.user_id)
        {
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
        data.task_votes.insert(vote.id, vote);
        let author_id = data.tasks[&vote.task_id].author_id;
        data.sub_task_stars(author_id, -i32::from(vote.stars_count));
        Ok(vote)
    }

    async fn task_vote_try_load(&self, vote_id: VoteId) -> Result<Option<TaskVote>> {
        let data = self.conn.lock().unwrap();
        Ok(data.task_votes.get(&vote_id).copied())
    }

    async fn task_vote_update(&self, vote_id: VoteId, stars_count: i16) -> Result<()> {
        crate::schema::check_stars(stars_count)?;
        let mut data = self.conn.lock().unwrap();
        let vote = match data.task_votes.get(&vote_id) {
            Some(vote) => *vote,
            None => {
                return Err(Error::NotFound {
                    table: "task_votes",
                    id: vote_id,
                })
            }
        };
        let author_id = data.tasks[&vote.task_id].author_id;
        data.sub_task_stars(author_id, i32::from(vote.stars_count) - i32::from(stars_count));
        data.task_votes.get_mut(&vote_id).unwrap().stars_count = stars_count;
        Ok(())
    }

    async fn task_vote_delete(&self, vote_id: VoteId) -> Result<()> {
        let mut data = self.conn.lock().unwrap();
        let vote = match data.task_votes.remove(&vote_id) {
            Some(vote) => vote,
            None => {
                return Err(Error::NotFound {
                    table: "task_votes",
                    id: vote_id,
                })
            }
        };
        let author_id = data.tasks[&vote.task_id].author_id;
        data.sub_task_stars(author_id, i32::from(vote.stars_count));
        Ok(())
    }

    async fn task_votes_of_task(&self, task_id: TaskId) -> Result<Vec<TaskVote>> {
        let data = self.conn.lock().unwrap();
        Ok(data
            .task_votes
            .values()
            .filter(|vote| vote.task_id == task_id)
            .copied()
            .collect())
    }

    async fn solution_vote_cast(&self, vote_data: NewSolutionVote) -> Result<SolutionVote> {
        crate::schema::check_stars(vote_data.stars_count)?;
        let mut data = self.conn.lock().unwrap();
        if !data.solutions.contains_key(&vote_data.solution_id) {
            return Err(Error::MissingParent {
                table: "solutions",
                id: vote_data.solution_id,
            });
        }
        data.check_user(vote_data.user_id)?;
        if data.solution_votes.values().any(|vote| {
            vote.solution_id == vote_data.solution_id && vote.user_id == vote_data.user_id
        }) {
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
        data.solution_votes.insert(vote.id, vote);
        let author_id = data.solutions[&vote.solution_id].author_id;
        data.sub_solution_stars(author_id, -i32::from(vote.stars_count));
        Ok(vote)
    }

    async fn solution_vote_try_load(&self, vote_id: VoteId) -> Result<Option<SolutionVote>> {
        let data = self.conn.lock().unwrap();
        Ok(data.solution_votes.get(&vote_id).copied())
    }

    async fn solution_vote_update(&self, vote_id: VoteId, stars_count: i16) -> Result<()> {
        crate::schema::check_stars(stars_count)?;
        let mut data = self.conn.lock().unwrap();
        let vote = match data.solution_votes.get(&vote_id) {
            Some(vote) => *vote,
            None => {
                return Err(Error::NotFound {
                    table: "solution_votes",
                    id: vote_id,
                })
            }
        };
        let author_id = data.solutions[&vote.solution_id].author_id;
        data.sub_solution_stars(
            author_id,
            i32::from(vote.stars_count) - i32::from(stars_count),
        );
        data.solution_votes.get_mut(&vote_id).unwrap().stars_count = stars_count;
        Ok(())
    }

    async fn solution_vote_delete(&self, vote_id: VoteId) -> Result<()> {
        let mut data = self.conn.lock().unwrap();
        let vote = match data.solution_votes.remove(&vote_id) {
            Some(vote) => vote,
            None => {
                return Err(Error::NotFound {
                    table: "solution_votes",
                    id: vote_id,
                })
            }
        };
        let author_id = data.solutions[&vote.solution_id].author_id;
        data.sub_solution_stars(author_id, i32::from(vote.stars_count));
        Ok(())
    }

    async fn solution_votes_of_solution(
        &self,
        solution_id: SolutionId,
    ) -> Result<Vec<SolutionVote>> {
        let data = self.conn.lock().unwrap();
        Ok(data
            .solution_votes
            .values()
            .filter(|vote| vote.solution_id == solution_id)
            .copied()
            .collect())
    }
}

#[async_trait]
impl TestsRepo for MemoryRepo {
    async fn test_data_new(&self, data_data: NewTestData) -> Result<TestData> {
        let mut data = self.conn.lock().unwrap();
        data.check_task(data_data.task_id)?;
        if data
            .test_data
            .values()
            .any(|row| row.task_id == data_data.task_id)
        {
            return Err(Error::validation(
                "task_id",
                data_data.task_id,
                "task already has test data",
            ));
        }
        let row = TestData {
            id: uuid::Uuid::new_v4(),
            task_id: data_data.task_id,
        };
        data.test_data.insert(row.id, row);
        Ok(row)
    }

    async fn test_data_try_load_by_task(&self, task_id: TaskId) -> Result<Option<TestData>> {
        let data = self.conn.lock().unwrap();
        Ok(data
            .test_data
            .values()
            .find(|row| row.task_id == task_id)
            .copied())
    }

    async fn test_data_delete(&self, test_data_id: TestDataId) -> Result<()> {
        let mut data = self.conn.lock().unwrap();
        if data.test_data.remove(&test_data_id).is_none() {
            return Err(Error::NotFound {
                table: "test_data",
                id: test_data_id,
            });
        }
        data.test_cases
            .retain(|_, case| case.test_data_id != test_data_id);
        Ok(())
    }

    async fn test_case_new(&self, case_data: NewTestCase) -> Result<TestCase> {
        let mut data = self.conn.lock().unwrap();
        if !data.test_data.contains_key(&case_data.test_data_id) {
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
        data.test_cases.insert(case.id, case.clone());
        Ok(case)
    }

    async fn test_cases_of_data(&self, test_data_id: TestDataId) -> Result<Vec<TestCase>> {
        let data = self.conn.lock().unwrap();
        Ok(data
            .test_cases
            .values()
            .filter(|case| case.test_data_id == test_data_id)
            .cloned()
            .collect())
    }
}

impl Repo for MemoryRepo {}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::FutureExt;

    fn new_user(nickname: &str) -> NewUser {
        NewUser {
            full_name: None,
            nickname: nickname.to_string(),
            email: None,
            password: "secret".to_string(),
            about: None,
            role: Role::User,
        }
    }

    fn make_user(repo: &MemoryRepo, nickname: &str) -> User {
        repo.user_new(new_user(nickname))
            .now_or_never()
            .unwrap()
            .unwrap()
    }

    fn make_task(repo: &MemoryRepo, author_id: UserId, name: &str) -> Task {
        repo.task_new(NewTask {
            name: name.to_string(),
            difficulty_level: DifficultyLevel::Easy,
            author_id,
        })
        .now_or_never()
        .unwrap()
        .unwrap()
    }

    mod users {
        use super::*;

        #[test]
        fn test_basic() {
            let repo = MemoryRepo::new();
            let user = make_user(&repo, "djangolo");
            let loaded = repo.user_load(user.id).now_or_never().unwrap().unwrap();
            assert_eq!(user, loaded);
            let by_nickname = repo
                .user_try_load_by_nickname("djangolo")
                .now_or_never()
                .unwrap()
                .unwrap()
                .unwrap();
            assert_eq!(user.id, by_nickname.id);
        }

        #[test]
        fn test_required_fields() {
            let repo = MemoryRepo::new();
            let mut missing_nickname = new_user("");
            missing_nickname.password = "p".to_string();
            assert!(repo
                .user_new(missing_nickname)
                .now_or_never()
                .unwrap()
                .is_err());
            let mut missing_password = new_user("someone");
            missing_password.password = String::new();
            assert!(repo
                .user_new(missing_password)
                .now_or_never()
                .unwrap()
                .is_err());
        }

        #[test]
        fn test_nickname_taken() {
            let repo = MemoryRepo::new();
            make_user(&repo, "dup");
            assert!(repo.user_new(new_user("dup")).now_or_never().unwrap().is_err());
        }

        #[test]
        fn test_patch() {
            let repo = MemoryRepo::new();
            let user = make_user(&repo, "patchy");
            let mut patch = UserPatch::default();
            patch.about("likes recursion".to_string()).role(Role::Staff);
            repo.user_update(user.id, patch).now_or_never().unwrap().unwrap();
            let patched = repo.user_load(user.id).now_or_never().unwrap().unwrap();
            assert_eq!(patched.about.as_deref(), Some("likes recursion"));
            assert_eq!(patched.role(), Role::Staff);
        }

        #[test]
        fn test_single_profile_image() {
            let repo = MemoryRepo::new();
            let user = make_user(&repo, "pic");
            let fields = ImageFields {
                name: "avatar".to_string(),
                content: vec![1, 2, 3],
            };
            repo.profile_image_new(NewProfileImage {
                user_id: user.id,
                fields: fields.clone(),
            })
            .now_or_never()
            .unwrap()
            .unwrap();
            let second = repo
                .profile_image_new(NewProfileImage {
                    user_id: user.id,
                    fields,
                })
                .now_or_never()
                .unwrap();
            assert!(second.is_err());
        }
    }

    mod tasks {
        use super::*;

        #[test]
        fn test_basic() {
            let repo = MemoryRepo::new();
            let author = make_user(&repo, "author");
            let task = make_task(&repo, author.id, "Two sum");
            let loaded = repo.task_load(task.id).now_or_never().unwrap().unwrap();
            assert_eq!(task, loaded);
            assert_eq!(loaded.difficulty_level(), DifficultyLevel::Easy);
            assert_eq!(loaded.create_date, loaded.last_modified);
        }

        #[test]
        fn test_author_must_exist() {
            let repo = MemoryRepo::new();
            let orphan = repo
                .task_new(NewTask {
                    name: "nobody's task".to_string(),
                    difficulty_level: DifficultyLevel::Hard,
                    author_id: uuid::Uuid::new_v4(),
                })
                .now_or_never()
                .unwrap();
            match orphan {
                Err(Error::MissingParent { table: "users", .. }) => {}
                other => panic!("expected MissingParent, got {:?}", other.map(|t| t.id)),
            }
        }

        #[test]
        fn test_patch() {
            let repo = MemoryRepo::new();
            let author = make_user(&repo, "author");
            let task = make_task(&repo, author.id, "before");
            let mut patch = TaskPatch::default();
            patch.name("after".to_string()).difficulty_level(DifficultyLevel::Medium);
            repo.task_update(task.id, patch).now_or_never().unwrap().unwrap();
            let patched = repo.task_load(task.id).now_or_never().unwrap().unwrap();
            assert_eq!(patched.name, "after");
            assert_eq!(patched.difficulty_level(), DifficultyLevel::Medium);
        }

        #[test]
        fn test_single_description() {
            let repo = MemoryRepo::new();
            let author = make_user(&repo, "author");
            let task = make_task(&repo, author.id, "task");
            let fields = DescriptionFields {
                text: "add the numbers".to_string(),
                links: vec!["https://example.com".to_string()],
            };
            repo.task_description_new(NewTaskDescription {
                task_id: task.id,
                fields: fields.clone(),
            })
            .now_or_never()
            .unwrap()
            .unwrap();
            assert!(repo
                .task_description_new(NewTaskDescription {
                    task_id: task.id,
                    fields,
                })
                .now_or_never()
                .unwrap()
                .is_err());
        }
    }

    mod votes {
        use super::*;

        #[test]
        fn test_stars_bounds() {
            let repo = MemoryRepo::new();
            let author = make_user(&repo, "author");
            let voter = make_user(&repo, "voter");
            let task = make_task(&repo, author.id, "task");
            for bad in &[-1, 6] {
                let res = repo
                    .task_vote_cast(NewTaskVote {
                        task_id: task.id,
                        user_id: voter.id,
                        stars_count: *bad,
                    })
                    .now_or_never()
                    .unwrap();
                match res {
                    Err(Error::Validation { field, .. }) => assert_eq!(field, "stars_count"),
                    other => panic!("expected validation error, got {:?}", other.map(|v| v.id)),
                }
            }
            // boundaries are inclusive
            repo.task_vote_cast(NewTaskVote {
                task_id: task.id,
                user_id: voter.id,
                stars_count: 0,
            })
            .now_or_never()
            .unwrap()
            .unwrap();
            let second_voter = make_user(&repo, "voter2");
            repo.task_vote_cast(NewTaskVote {
                task_id: task.id,
                user_id: second_voter.id,
                stars_count: 5,
            })
            .now_or_never()
            .unwrap()
            .unwrap();
        }

        #[test]
        fn test_duplicate_vote() {
            let repo = MemoryRepo::new();
            let author = make_user(&repo, "author");
            let voter = make_user(&repo, "voter");
            let task = make_task(&repo, author.id, "task");
            repo.task_vote_cast(NewTaskVote {
                task_id: task.id,
                user_id: voter.id,
                stars_count: 3,
            })
            .now_or_never()
            .unwrap()
            .unwrap();
            assert!(repo
                .task_vote_cast(NewTaskVote {
                    task_id: task.id,
                    user_id: voter.id,
                    stars_count: 4,
                })
                .now_or_never()
                .unwrap()
                .is_err());
        }

        #[test]
        fn test_star_aggregates() {
            let repo = MemoryRepo::new();
            let author = make_user(&repo, "author");
            let voter = make_user(&repo, "voter");
            let task = make_task(&repo, author.id, "task");
            let vote = repo
                .task_vote_cast(NewTaskVote {
                    task_id: task.id,
                    user_id: voter.id,
                    stars_count: 4,
                })
                .now_or_never()
                .unwrap()
                .unwrap();
            let load = |id| repo.user_load(id).now_or_never().unwrap().unwrap();
            assert_eq!(load(author.id).task_stars_received, 4);
            repo.task_vote_update(vote.id, 1).now_or_never().unwrap().unwrap();
            assert_eq!(load(author.id).task_stars_received, 1);
            repo.task_vote_delete(vote.id).now_or_never().unwrap().unwrap();
            assert_eq!(load(author.id).task_stars_received, 0);
        }
    }

    mod cascade {
        use super::*;

        #[test]
        fn test_task_subtree() {
            let repo = MemoryRepo::new();
            let author = make_user(&repo, "author");
            let task = make_task(&repo, author.id, "task");
            let description = repo
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
            let hint = repo
                .hint_new(NewHint { task_id: task.id })
                .now_or_never()
                .unwrap()
                .unwrap();
            repo.task_delete(task.id).now_or_never().unwrap().unwrap();
            assert!(repo
                .task_try_load(task.id)
                .now_or_never()
                .unwrap()
                .unwrap()
                .is_none());
            assert!(repo
                .task_description_try_load_by_task(task.id)
                .now_or_never()
                .unwrap()
                .unwrap()
                .is_none());
            assert!(repo
                .hints_of_task(task.id)
                .now_or_never()
                .unwrap()
                .unwrap()
                .is_empty());
            // author survives
            assert!(repo
                .user_try_load(author.id)
                .now_or_never()
                .unwrap()
                .unwrap()
                .is_some());
            let _ = (description, hint);
        }

        #[test]
        fn test_tags_survive_task() {
            let repo = MemoryRepo::new();
            let author = make_user(&repo, "author");
            let task = make_task(&repo, author.id, "task");
            let tag = repo
                .tag_new(NewTag {
                    text: "Math operations".to_string(),
                })
                .now_or_never()
                .unwrap()
                .unwrap();
            repo.tag_attach(task.id, tag.id).now_or_never().unwrap().unwrap();
            repo.task_delete(task.id).now_or_never().unwrap().unwrap();
            assert!(repo
                .tasks_with_tag(tag.id)
                .now_or_never()
                .unwrap()
                .unwrap()
                .is_empty());
            assert!(repo
                .tag_try_load(tag.id)
                .now_or_never()
                .unwrap()
                .unwrap()
                .is_some());
        }
    }
}
