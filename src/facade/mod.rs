mod service;

pub use service::LiveObjectService;
