pub mod article;
pub mod feed;

pub use article::Article;
pub use feed::Feed;
