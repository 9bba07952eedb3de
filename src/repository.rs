use std::cmp::Ordering;
use std::str::FromStr;

use log::debug;
use rustc_serialize::json::Object;

use crate::error::{RepoError, RepoResult};
use crate::model::{Post, PostId, PostPatch};

/// Field a list query may sort on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    Title,
    Content,
}

impl SortKey {
    fn value_of(self, post: &Post) -> &str {
        match self {
            SortKey::Title => post.title(),
            SortKey::Content => post.content(),
        }
    }
}

impl FromStr for SortKey {
    type Err = RepoError;

    fn from_str(s: &str) -> RepoResult<SortKey> {
        match s {
            "title" => Ok(SortKey::Title),
            "content" => Ok(SortKey::Content),
            _ => Err(RepoError::invalid_sort()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl Default for SortDirection {
    fn default() -> SortDirection {
        SortDirection::Asc
    }
}

impl FromStr for SortDirection {
    type Err = RepoError;

    fn from_str(s: &str) -> RepoResult<SortDirection> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(RepoError::invalid_direction()),
        }
    }
}

/// Owns the posts, in insertion order.
///
/// Not synchronized: callers sharing a repository between threads must
/// serialize every call through one lock.
#[derive(Clone, Debug, Default)]
pub struct PostRepository {
    posts: Vec<Post>,
}

impl PostRepository {
    pub fn new() -> PostRepository {
        PostRepository { posts: vec![] }
    }

    /// A repository holding the sample posts the service starts with.
    pub fn seeded() -> PostRepository {
        let samples = [
            ("First post", "This is the first post."),
            ("Second post", "This is the second post."),
            (
                "The Power of AI",
                "Exploring how artificial intelligence is transforming industries.",
            ),
            (
                "Web Development Trends",
                "Latest trends in web development for 2023.",
            ),
            ("Healthy Living", "Tips and tricks for lifestyle."),
        ];

        let posts = samples
            .iter()
            .zip(1..)
            .map(|(&(title, content), id)| Post::new(id, title, content))
            .collect();
        PostRepository { posts }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn get(&self, id: PostId) -> RepoResult<&Post> {
        self.posts
            .iter()
            .find(|post| post.id() == id)
            .ok_or(RepoError::NotFound(id))
    }

    /// All posts, optionally sorted by `sort` in `direction` (default `asc`).
    ///
    /// Sorting is stable and works on a copy; the stored order never changes.
    /// `direction` is only checked when `sort` is given.
    pub fn list(&self, sort: Option<&str>, direction: Option<&str>) -> RepoResult<Vec<Post>> {
        let key = match sort {
            None => return Ok(self.posts.clone()),
            Some(sort) => sort.parse::<SortKey>()?,
        };
        let direction = match direction {
            None => SortDirection::default(),
            Some(direction) => direction.parse::<SortDirection>()?,
        };
        Ok(self.sorted(key, direction))
    }

    pub fn sorted(&self, key: SortKey, direction: SortDirection) -> Vec<Post> {
        let mut sorted = self.posts.clone();
        sorted.sort_by(|a, b| {
            let ordering: Ordering = key.value_of(a).cmp(key.value_of(b));
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        sorted
    }

    /// Case-insensitive substring search. An empty query never matches.
    pub fn search(&self, title: &str, content: &str) -> Vec<Post> {
        let title = title.to_lowercase();
        let content = content.to_lowercase();

        self.posts
            .iter()
            .filter(|post| {
                let title_match = !title.is_empty() && post.title().to_lowercase().contains(&title);
                let content_match =
                    !content.is_empty() && post.content().to_lowercase().contains(&content);
                title_match || content_match
            })
            .cloned()
            .collect()
    }

    /// Store a new post built from `payload` and return it.
    /// Any `id` in the payload is replaced by the next free one.
    pub fn create(&mut self, payload: Object) -> RepoResult<Post> {
        let patch = PostPatch::from_object(payload)?;
        let post = Post::from_patch(self.next_id(), patch)?;
        debug!("created post {}", post.id());
        self.posts.push(post.clone());
        Ok(post)
    }

    /// Merge `payload` into the post with `id` and return the result.
    pub fn update(&mut self, id: PostId, payload: Object) -> RepoResult<Post> {
        let index = self.position(id)?;
        let patch = PostPatch::from_object(payload)?;
        if patch.is_empty() {
            debug!("empty update for post {}", id);
        }
        let post = &mut self.posts[index];
        post.apply(patch);
        debug!("updated post {}", id);
        Ok(post.clone())
    }

    pub fn delete(&mut self, id: PostId) -> RepoResult<Post> {
        let index = self.position(id)?;
        debug!("deleted post {}", id);
        Ok(self.posts.remove(index))
    }

    fn position(&self, id: PostId) -> RepoResult<usize> {
        self.posts
            .iter()
            .position(|post| post.id() == id)
            .ok_or(RepoError::NotFound(id))
    }

    // max + 1, so deleting the newest post frees its id again
    fn next_id(&self) -> PostId {
        self.posts.iter().map(Post::id).max().map_or(1, |max| max + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parse_object;

    fn payload(body: &str) -> Object {
        parse_object(body).expect("test payload should be a JSON object")
    }

    fn ids(posts: &[Post]) -> Vec<PostId> {
        posts.iter().map(Post::id).collect()
    }

    fn titles(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(Post::title).collect()
    }

    fn two_posts() -> PostRepository {
        let mut repository = PostRepository::new();
        repository
            .create(payload(r#"{"title": "First post", "content": "This is the first post."}"#))
            .unwrap();
        repository
            .create(payload(r#"{"title": "Second post", "content": "This is the second post."}"#))
            .unwrap();
        repository
    }

    #[test]
    fn seeded_has_five_posts_in_id_order() {
        let repository = PostRepository::seeded();
        assert_eq!(ids(repository.posts()), vec![1, 2, 3, 4, 5]);
        assert_eq!(repository.get(3).unwrap().title(), "The Power of AI");
    }

    #[test]
    fn first_id_is_one() {
        let mut repository = PostRepository::new();
        let post = repository.create(payload(r#"{"title": "a", "content": "b"}"#)).unwrap();
        assert_eq!(post.id(), 1);
    }

    #[test]
    fn ids_are_max_plus_one() {
        let mut repository = PostRepository::seeded();
        repository.delete(2).unwrap();
        let post = repository.create(payload(r#"{"title": "X", "content": "Y"}"#)).unwrap();
        assert_eq!(post.id(), 6);

        repository.delete(6).unwrap();
        repository.delete(5).unwrap();
        let post = repository.create(payload(r#"{"title": "X", "content": "Y"}"#)).unwrap();
        assert_eq!(post.id(), 5);
    }

    #[test]
    fn create_ignores_client_id_and_keeps_extra_fields() {
        let mut repository = two_posts();
        let post = repository
            .create(payload(r#"{"id": 1, "title": "X", "content": "Y", "author": "me"}"#))
            .unwrap();
        assert_eq!(post.id(), 3);
        assert!(post.extra().contains_key("author"));
        assert_eq!(repository.get(3).unwrap(), &post);
        assert_eq!(ids(repository.posts()), vec![1, 2, 3]);
    }

    #[test]
    fn create_without_content_fails_and_changes_nothing() {
        let mut repository = two_posts();
        let err = repository.create(payload(r#"{"title": "X"}"#)).unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
        assert_eq!(repository.len(), 2);
    }

    #[test]
    fn list_without_sort_keeps_insertion_order() {
        let repository = two_posts();
        assert_eq!(repository.list(None, None).unwrap(), repository.posts().to_vec());
        // direction is ignored without a sort key
        assert!(repository.list(None, Some("sideways")).is_ok());
    }

    #[test]
    fn list_sorts_a_copy() {
        let mut repository = two_posts();
        repository.create(payload(r#"{"title": "X", "content": "Y"}"#)).unwrap();

        let sorted = repository.list(Some("title"), Some("desc")).unwrap();
        assert_eq!(titles(&sorted), vec!["X", "Second post", "First post"]);

        let sorted = repository.list(Some("content"), None).unwrap();
        assert_eq!(ids(&sorted), vec![1, 2, 3]);

        assert_eq!(ids(repository.posts()), vec![1, 2, 3]);
        assert_eq!(ids(&repository.list(None, None).unwrap()), vec![1, 2, 3]);
    }

    #[test]
    fn sort_is_stable_in_both_directions() {
        let mut repository = PostRepository::new();
        for body in &[
            r#"{"title": "b", "content": "1"}"#,
            r#"{"title": "a", "content": "2"}"#,
            r#"{"title": "b", "content": "3"}"#,
        ] {
            repository.create(payload(body)).unwrap();
        }

        let asc = repository.sorted(SortKey::Title, SortDirection::Asc);
        assert_eq!(ids(&asc), vec![2, 1, 3]);
        let desc = repository.sorted(SortKey::Title, SortDirection::Desc);
        assert_eq!(ids(&desc), vec![1, 3, 2]);
    }

    #[test]
    fn sorted_output_is_ordered_permutation() {
        let repository = PostRepository::seeded();
        for &key in &[SortKey::Title, SortKey::Content] {
            let asc = repository.sorted(key, SortDirection::Asc);
            let desc = repository.sorted(key, SortDirection::Desc);
            assert!(asc.windows(2).all(|w| key.value_of(&w[0]) <= key.value_of(&w[1])));
            assert!(desc.windows(2).all(|w| key.value_of(&w[0]) >= key.value_of(&w[1])));

            let mut seen = ids(&asc);
            seen.sort();
            assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        }
    }

    #[test]
    fn list_rejects_unknown_parameters() {
        let repository = two_posts();
        assert_eq!(repository.list(Some("id"), None), Err(RepoError::invalid_sort()));
        assert_eq!(
            repository.list(Some("title"), Some("DESC")),
            Err(RepoError::invalid_direction())
        );
    }

    #[test]
    fn search_matches_either_field_case_insensitively() {
        let repository = PostRepository::seeded();

        assert_eq!(ids(&repository.search("POST", "")), vec![1, 2]);
        assert_eq!(ids(&repository.search("", "INDUSTRIES")), vec![3]);
        assert_eq!(ids(&repository.search("healthy", "web development")), vec![4, 5]);
        assert!(repository.search("nothing like this", "").is_empty());
    }

    #[test]
    fn empty_queries_match_nothing() {
        let repository = PostRepository::seeded();
        assert!(repository.search("", "").is_empty());
    }

    #[test]
    fn update_merges_fields_but_not_id() {
        let mut repository = two_posts();
        let post = repository
            .update(1, payload(r#"{"id": 9, "title": "Renamed", "tags": ["a"]}"#))
            .unwrap();

        assert_eq!(post.id(), 1);
        assert_eq!(post.title(), "Renamed");
        assert_eq!(post.content(), "This is the first post.");
        assert!(post.extra().contains_key("tags"));
        assert_eq!(repository.get(1).unwrap(), &post);
        assert!(repository.get(9).is_err());
    }

    #[test]
    fn empty_update_returns_post_unchanged() {
        let mut repository = PostRepository::new();
        let created = repository.create(payload(r#"{"title": "T", "content": "C"}"#)).unwrap();
        let updated = repository.update(created.id(), Object::new()).unwrap();
        assert_eq!(updated, created);
    }

    #[test]
    fn invalid_update_applies_nothing() {
        let mut repository = two_posts();
        let err = repository
            .update(1, payload(r#"{"title": "New", "content": 5}"#))
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
        assert_eq!(repository.get(1).unwrap().title(), "First post");
    }

    #[test]
    fn update_and_delete_of_missing_id_fail() {
        let mut repository = two_posts();
        let before = repository.posts().to_vec();

        assert_eq!(repository.update(42, Object::new()), Err(RepoError::NotFound(42)));
        assert_eq!(repository.delete(42), Err(RepoError::NotFound(42)));
        assert_eq!(repository.posts(), &before[..]);
    }

    #[test]
    fn delete_returns_the_removed_post() {
        let mut repository = two_posts();
        let created = repository.create(payload(r#"{"title": "T", "content": "C"}"#)).unwrap();

        let deleted = repository.delete(created.id()).unwrap();
        assert_eq!(deleted, created);
        assert_eq!(ids(&repository.list(None, None).unwrap()), vec![1, 2]);
    }
}
