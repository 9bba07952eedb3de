use rustc_serialize::json::{Json, Object, ToJson};

use crate::error::{RepoError, RepoResult};

pub type PostId = u64;

#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    id: PostId,
    title: String,
    content: String,
    /// Fields beyond the required ones, added by create or update payloads.
    extra: Object,
}

impl Post {
    pub fn new(id: PostId, title: &str, content: &str) -> Post {
        Post {
            id,
            title: title.to_string(),
            content: content.to_string(),
            extra: Object::new(),
        }
    }

    pub fn id(&self) -> PostId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn extra(&self) -> &Object {
        &self.extra
    }

    /// Build a new post from a decoded payload.
    /// Both `title` and `content` must be present and non-empty.
    pub fn from_patch(id: PostId, patch: PostPatch) -> RepoResult<Post> {
        let title = required(patch.title, "title")?;
        let content = required(patch.content, "content")?;
        Ok(Post {
            id,
            title,
            content,
            extra: patch.extra,
        })
    }

    /// Shallow merge: every field present in `patch` overwrites ours.
    pub fn apply(&mut self, patch: PostPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        self.extra.extend(patch.extra);
    }
}

fn required(value: Option<String>, field: &str) -> RepoResult<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(RepoError::Validation(format!("missing or empty `{}`", field))),
    }
}

impl ToJson for Post {
    fn to_json(&self) -> Json {
        let mut object = self.extra.clone();
        object.insert("id".to_owned(), self.id.to_json());
        object.insert("title".to_owned(), self.title.to_json());
        object.insert("content".to_owned(), self.content.to_json());
        Json::Object(object)
    }
}

/// The fields a client may set on a post.
///
/// `id` is dropped while decoding, so a patch can never change identity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub extra: Object,
}

impl PostPatch {
    pub fn from_object(mut object: Object) -> RepoResult<PostPatch> {
        object.remove("id");
        let title = string_field(&mut object, "title")?;
        let content = string_field(&mut object, "content")?;
        Ok(PostPatch {
            title,
            content,
            extra: object,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.extra.is_empty()
    }
}

fn string_field(object: &mut Object, field: &str) -> RepoResult<Option<String>> {
    match object.remove(field) {
        None => Ok(None),
        Some(Json::String(value)) => Ok(Some(value)),
        Some(_) => Err(RepoError::Validation(format!("`{}` must be a string", field))),
    }
}

/// Parse a request body into a JSON object.
pub fn parse_object(body: &str) -> RepoResult<Object> {
    match Json::from_str(body) {
        Ok(Json::Object(object)) => Ok(object),
        Ok(_) => Err(RepoError::Validation("expected a JSON object".to_owned())),
        Err(e) => Err(RepoError::Validation(e.to_string())),
    }
}

/// Encode a sequence of posts as a JSON array.
pub fn posts_to_json(posts: &[Post]) -> Json {
    Json::Array(posts.iter().map(ToJson::to_json).collect())
}
