// @generated
// Generated from: proto/dcmgr/v1/dcmgr.proto
// Manual check-in for offline builds.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DataCenter {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub report: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Task {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub image: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub url: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub data_center_id: ::prost::alloc::string::String,
    #[prost(enumeration = "TaskStatus", tag = "6")]
    pub status: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TaskFeedback {
    #[prost(string, tag = "1")]
    pub task_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub url: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub data_center_id: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub report: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Event {
    #[prost(enumeration = "Operation", tag = "1")]
    pub event_type: i32,
    #[prost(oneof = "event::OpMessage", tags = "2, 3, 4")]
    pub op_message: ::core::option::Option<event::OpMessage>,
}

/// Nested message and enum types in `Event`.
pub mod event {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum OpMessage {
        #[prost(message, tag = "2")]
        DataCenter(super::DataCenter),
        #[prost(message, tag = "3")]
        Task(super::Task),
        #[prost(message, tag = "4")]
        TaskFeedback(super::TaskFeedback),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Operation {
    Heartbeat = 0,
    TaskCreate = 1,
    TaskUpdate = 2,
    TaskCancel = 3,
}

impl Operation {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Heartbeat => "HEARTBEAT",
            Self::TaskCreate => "TASK_CREATE",
            Self::TaskUpdate => "TASK_UPDATE",
            Self::TaskCancel => "TASK_CANCEL",
        }
    }

    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "HEARTBEAT" => Some(Self::Heartbeat),
            "TASK_CREATE" => Some(Self::TaskCreate),
            "TASK_UPDATE" => Some(Self::TaskUpdate),
            "TASK_CANCEL" => Some(Self::TaskCancel),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TaskStatus {
    Running = 0,
    StartFailed = 1,
    UpdateSuccess = 2,
    UpdateFailed = 3,
    Cancelled = 4,
    CancelFailed = 5,
}

impl TaskStatus {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::StartFailed => "START_FAILED",
            Self::UpdateSuccess => "UPDATE_SUCCESS",
            Self::UpdateFailed => "UPDATE_FAILED",
            Self::Cancelled => "CANCELLED",
            Self::CancelFailed => "CANCEL_FAILED",
        }
    }

    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "RUNNING" => Some(Self::Running),
            "START_FAILED" => Some(Self::StartFailed),
            "UPDATE_SUCCESS" => Some(Self::UpdateSuccess),
            "UPDATE_FAILED" => Some(Self::UpdateFailed),
            "CANCELLED" => Some(Self::Cancelled),
            "CANCEL_FAILED" => Some(Self::CancelFailed),
            _ => None,
        }
    }
}

pub mod dc_streamer_client {
    #![allow(clippy::derive_partial_eq_without_eq)]
    use tonic::codegen::*;

    #[derive(Debug, Clone)]
    pub struct DcStreamerClient<T> {
        inner: tonic::client::Grpc<T>,
    }

    impl DcStreamerClient<tonic::transport::Channel> {
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }

    impl<T> DcStreamerClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::ResponseBody: Body + Send + 'static,
        T::Error: Into<StdError>,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
        <T::ResponseBody as Body>::Data: Into<Bytes> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }

        pub async fn server_stream(
            &mut self,
            request: impl tonic::IntoStreamingRequest<Message = super::Event>,
        ) -> Result<tonic::Response<tonic::codec::Streaming<super::Event>>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = tonic::codegen::http::uri::PathAndQuery::from_static(
                "/dcmgr.v1.DcStreamer/ServerStream",
            );
            self.inner
                .streaming(request.into_streaming_request(), path, codec)
                .await
        }
    }
}
