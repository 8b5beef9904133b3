use crate::define::ActionDefine;
use crate::define::method::EVENT_TYPE;
use crate::error::DefineError;
use crate::value::ValueType;
use tracing::info;

// The ambient parameters below are declared through `param`, which binds them by type.

pub(super) fn get_card() -> Result<ActionDefine, DefineError> {
    ActionDefine::method("GetCard")
        .param("card", ValueType::Card)
        .returns(ValueType::Card)
        .body(|call| {
            let card = call.arg("card")?.clone();
            call.set_return(card);
            Ok(())
        })
        .build()
}

pub(super) fn get_buff() -> Result<ActionDefine, DefineError> {
    ActionDefine::method("GetBuff")
        .param("buff", ValueType::Buff)
        .returns(ValueType::Buff)
        .body(|call| {
            let buff = call.arg("buff")?.clone();
            call.set_return(buff);
            Ok(())
        })
        .build()
}

pub(super) fn get_event() -> Result<ActionDefine, DefineError> {
    let event_type = ValueType::object(EVENT_TYPE);
    ActionDefine::method("GetEvent")
        .param("event", event_type.clone())
        .returns(event_type)
        .body(|call| {
            let event = call.arg("event")?.clone();
            call.set_return(event);
            Ok(())
        })
        .build()
}

pub(super) fn log() -> Result<ActionDefine, DefineError> {
    ActionDefine::method("Log")
        .input("message", ValueType::String)
        .body(|call| {
            let message = call.str("message")?;
            info!(node_id = %call.node_id(), message, "graph_log");
            Ok(())
        })
        .build()
}
