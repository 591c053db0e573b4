pub(crate) mod clock;
pub(crate) mod controller;
pub(crate) mod question_bank;
pub(crate) mod session;
pub(crate) mod violations;
