pub mod biometric;
pub mod domain;
pub mod generator;
pub mod ports;
pub mod session_gate;
pub mod view_state;

pub use biometric::{run_gate, GateOutcome, SimulatedBiometricGate};
pub use domain::{
    DiaryEntry, NewDiaryEntry, NewSecret, Secret, Session, SessionEvent, User, UserCredentials,
};
pub use generator::{generate_secret, generate_secret_with, ALPHABET, SECRET_LENGTH};
pub use ports::{
    BiometricGate, IdentityService, PortError, PortResult, RecordStore, SessionEventStream,
};
pub use session_gate::{GateDecision, Route, SessionGate};
pub use view_state::{
    DiaryForm, Drawer, GenerateForm, Panel, SecretForm, ValidationError, VaultViewState, VALUE_MASK,
};
