pub mod login_event;
pub mod risk;

pub use login_event::{
    AuthenticationMethod, EventAuthentication, EventQuery, EventRequest, EventStats, EventUser,
    LoginEvent,
};
pub use risk::{
    ConnectionInformation, Decision, EventType, LoginMethod, LoginSignals, LoginStatus,
    RiskCheckRequest, RiskDecisionResponse, RiskVerdict,
};
