use std::io::Read;
use std::sync::{Arc, Mutex};

use iron::headers::{AccessControlAllowOrigin, ContentType};
use iron::status::{self, Status};
use iron::{AfterMiddleware, Handler, IronError, IronResult, Plugin, Request, Response};
use log::{error, warn};
use router::Router;
use rustc_serialize::json::{Json, Object, ToJson};
use urlencoded::UrlEncodedQuery;

use crate::error::RepoError;
use crate::model::{parse_object, posts_to_json, PostId};
use crate::repository::PostRepository;

/// Match a `Result` into its inner value or
/// return `500 Internal Server Error` with a JSON error body,
/// or some other provided status using the second variant of this macro.
macro_rules! try_handler {
    ( $e:expr ) => {
        match $e {
            Ok(x) => x,
            Err(e) => return Ok(error_response(status::InternalServerError, &e.to_string()))
        }
    };
    ( $e:expr, $error:expr ) => {
        match $e {
            Ok(x) => x,
            Err(e) => return Ok(error_response($error, &e.to_string()))
        }
    }
}

/// Lock a `Mutex`. This macro simply calls `m.lock().unwrap()`,
/// because the thread should panic if the lock can not be obtained:
/// we cannot recover from that.
macro_rules! lock {
    ( $e:expr ) => { $e.lock().unwrap() }
}

/// Get the post id from the URI.
/// If it is absent or not an integer, return `404 Not Found`:
/// no post can live at that path.
/// If we could not obtain the parameter list, return `500 Internal Server Error`.
macro_rules! get_post_id {
    ( $r:expr ) => {
        match $r.extensions.get::<Router>() {
            Some(router) => {
                match router.find("id").and_then(|raw| raw.parse::<PostId>().ok()) {
                    Some(id) => id,
                    None => return Ok(error_response(status::NotFound, "Not found")),
                }
            }
            None => return Ok(error_response(status::InternalServerError, "Routing unavailable")),
        }
    }
}

fn json_response(status: Status, json: &Json) -> Response {
    Response::with((status, json.to_string()))
}

fn error_response(status: Status, message: &str) -> Response {
    let mut body = Object::new();
    body.insert("error".to_owned(), message.to_json());
    json_response(status, &Json::Object(body))
}

fn repo_error_status(err: &RepoError) -> Status {
    match *err {
        RepoError::InvalidParameter(_) | RepoError::Validation(_) => status::BadRequest,
        RepoError::NotFound(_) => status::NotFound,
        RepoError::SortFailure(_) => status::InternalServerError,
    }
}

fn repo_error_response(err: &RepoError) -> Response {
    let status = repo_error_status(err);
    let mut body = Object::new();
    body.insert("error".to_owned(), err.to_string().to_json());
    if let Some(details) = err.details() {
        error!("{}: {}", err, details);
        body.insert("details".to_owned(), details.to_json());
    } else {
        warn!("rejected request: {}", err);
    }
    json_response(status, &Json::Object(body))
}

/// First value of query parameter `name`, if the query has one.
fn query_param(req: &mut Request, name: &str) -> Option<String> {
    match req.get_ref::<UrlEncodedQuery>() {
        Ok(params) => params.get(name).and_then(|values| values.first()).cloned(),
        Err(_) => None,
    }
}

fn read_object(req: &mut Request) -> Result<Object, RepoError> {
    let mut payload = String::new();
    req.body
        .read_to_string(&mut payload)
        .map_err(|e| RepoError::Validation(e.to_string()))?;
    parse_object(&payload)
}

pub struct Handlers {
    pub list: ListHandler,
    pub search: SearchHandler,
    pub create: CreateHandler,
    pub update: UpdateHandler,
    pub delete: DeleteHandler,
}

impl Handlers {
    pub fn shared(repository: Arc<Mutex<PostRepository>>) -> Handlers {
        Handlers {
            list: ListHandler::new(repository.clone()),
            search: SearchHandler::new(repository.clone()),
            create: CreateHandler::new(repository.clone()),
            update: UpdateHandler::new(repository.clone()),
            delete: DeleteHandler::new(repository),
        }
    }
}

pub struct ListHandler {
    repository: Arc<Mutex<PostRepository>>,
}

impl ListHandler {
    fn new(repository: Arc<Mutex<PostRepository>>) -> ListHandler {
        ListHandler { repository }
    }
}

impl Handler for ListHandler {
    fn handle(&self, req: &mut Request) -> IronResult<Response> {
        let sort = query_param(req, "sort");
        let direction = query_param(req, "direction");

        let result = lock!(self.repository).list(sort.as_deref(), direction.as_deref());
        match result {
            Ok(posts) => Ok(json_response(status::Ok, &posts_to_json(&posts))),
            Err(e) => Ok(repo_error_response(&e)),
        }
    }
}

pub struct SearchHandler {
    repository: Arc<Mutex<PostRepository>>,
}

impl SearchHandler {
    fn new(repository: Arc<Mutex<PostRepository>>) -> SearchHandler {
        SearchHandler { repository }
    }
}

impl Handler for SearchHandler {
    fn handle(&self, req: &mut Request) -> IronResult<Response> {
        let title = query_param(req, "title").unwrap_or_default();
        let content = query_param(req, "content").unwrap_or_default();

        let posts = lock!(self.repository).search(&title, &content);
        // Clients of this endpoint expect 201 here.
        Ok(json_response(status::Created, &posts_to_json(&posts)))
    }
}

pub struct CreateHandler {
    repository: Arc<Mutex<PostRepository>>,
}

impl CreateHandler {
    fn new(repository: Arc<Mutex<PostRepository>>) -> CreateHandler {
        CreateHandler { repository }
    }
}

impl Handler for CreateHandler {
    fn handle(&self, req: &mut Request) -> IronResult<Response> {
        let payload = try_handler!(read_object(req), status::BadRequest);

        let result = lock!(self.repository).create(payload);
        match result {
            Ok(post) => Ok(json_response(status::Created, &post.to_json())),
            Err(e) => Ok(repo_error_response(&e)),
        }
    }
}

pub struct UpdateHandler {
    repository: Arc<Mutex<PostRepository>>,
}

impl UpdateHandler {
    fn new(repository: Arc<Mutex<PostRepository>>) -> UpdateHandler {
        UpdateHandler { repository }
    }
}

impl Handler for UpdateHandler {
    fn handle(&self, req: &mut Request) -> IronResult<Response> {
        let id = get_post_id!(req);
        let payload = read_object(req);

        // Unknown ids answer 404 whatever the body holds.
        let mut repository = lock!(self.repository);
        if let Err(e) = repository.get(id) {
            return Ok(repo_error_response(&e));
        }
        let payload = try_handler!(payload, status::BadRequest);

        match repository.update(id, payload) {
            Ok(post) => Ok(json_response(status::Ok, &post.to_json())),
            Err(e) => Ok(repo_error_response(&e)),
        }
    }
}

pub struct DeleteHandler {
    repository: Arc<Mutex<PostRepository>>,
}

impl DeleteHandler {
    fn new(repository: Arc<Mutex<PostRepository>>) -> DeleteHandler {
        DeleteHandler { repository }
    }
}

impl Handler for DeleteHandler {
    fn handle(&self, req: &mut Request) -> IronResult<Response> {
        let id = get_post_id!(req);

        let result = lock!(self.repository).delete(id);
        match result {
            Ok(post) => Ok(json_response(status::Ok, &post.to_json())),
            Err(e) => Ok(repo_error_response(&e)),
        }
    }
}

/// Answers CORS preflight requests. The headers come from `CorsAfterMiddleware`.
pub struct PreflightHandler;

impl Handler for PreflightHandler {
    fn handle(&self, _: &mut Request) -> IronResult<Response> {
        Ok(Response::with(status::Ok))
    }
}

pub struct JsonAfterMiddleware;

impl AfterMiddleware for JsonAfterMiddleware {
    fn after(&self, _: &mut Request, mut res: Response) -> IronResult<Response> {
        res.headers.set(ContentType::json());
        Ok(res)
    }
}

/// Lets browsers on any origin call the API.
pub struct CorsAfterMiddleware;

impl CorsAfterMiddleware {
    fn add_headers(res: &mut Response) {
        res.headers.set(AccessControlAllowOrigin::Any);
        res.headers.set_raw(
            "Access-Control-Allow-Methods",
            vec![b"GET, POST, PUT, DELETE, OPTIONS".to_vec()],
        );
        res.headers
            .set_raw("Access-Control-Allow-Headers", vec![b"Content-Type".to_vec()]);
    }
}

impl AfterMiddleware for CorsAfterMiddleware {
    fn after(&self, _: &mut Request, mut res: Response) -> IronResult<Response> {
        CorsAfterMiddleware::add_headers(&mut res);
        Ok(res)
    }

    fn catch(&self, _: &mut Request, mut err: IronError) -> IronResult<Response> {
        CorsAfterMiddleware::add_headers(&mut err.response);
        Err(err)
    }
}
