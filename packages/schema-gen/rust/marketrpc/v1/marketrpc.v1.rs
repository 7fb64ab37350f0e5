// @generated
// This file is @generated by prost-build.
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct DataRequest {
    /// Query type tag.
    #[prost(string, tag = "1")]
    pub r#type: ::prost::alloc::string::String,
    /// JSON-encoded query parameters.
    #[prost(string, tag = "2")]
    pub json_data: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct DataResponse {
    /// Server status code.
    #[prost(int32, tag = "1")]
    pub code: i32,
    /// Server status message.
    #[prost(string, tag = "2")]
    pub msg: ::prost::alloc::string::String,
    /// Whether the server considers the query successful.
    #[prost(bool, tag = "3")]
    pub success: bool,
    /// Echo of the query type tag.
    #[prost(string, tag = "4")]
    pub r#type: ::prost::alloc::string::String,
    /// JSON-encoded result document.
    #[prost(string, tag = "5")]
    pub json_data: ::prost::alloc::string::String,
}
