//! Conversions between domain envelopes and generated protobuf messages.

use super::proto::marketrpc::v1::{DataRequest, DataResponse};
use crate::domain::envelope::{RequestEnvelope, ResponseEnvelope};

impl From<RequestEnvelope> for DataRequest {
    fn from(envelope: RequestEnvelope) -> Self {
        Self {
            r#type: envelope.type_tag,
            json_data: envelope.json_data,
        }
    }
}

impl From<DataRequest> for RequestEnvelope {
    fn from(request: DataRequest) -> Self {
        Self {
            type_tag: request.r#type,
            json_data: request.json_data,
        }
    }
}

impl From<DataResponse> for ResponseEnvelope {
    fn from(response: DataResponse) -> Self {
        Self {
            code: response.code,
            msg: response.msg,
            success: response.success,
            type_tag: response.r#type,
            json_data: response.json_data,
        }
    }
}

impl From<ResponseEnvelope> for DataResponse {
    fn from(envelope: ResponseEnvelope) -> Self {
        Self {
            code: envelope.code,
            msg: envelope.msg,
            success: envelope.success,
            r#type: envelope.type_tag,
            json_data: envelope.json_data,
        }
    }
}
