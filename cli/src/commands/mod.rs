mod account;
mod calc;
mod data;
mod exercises;
mod helpers;
mod meals;
mod profile;
mod program;
mod progress;
mod template;
mod workout;

pub(crate) use account::{cmd_signin, cmd_signout, cmd_signup, cmd_status, cmd_sync};
pub(crate) use calc::{cmd_calc_convert, cmd_calc_one_rm, cmd_calc_plates, cmd_calc_rest};
pub(crate) use data::{cmd_data_repair, cmd_data_reset};
pub(crate) use exercises::cmd_exercises;
pub(crate) use meals::{cmd_meals_activate, cmd_meals_list, cmd_meals_show};
pub(crate) use profile::{ProfileSetArgs, cmd_profile_set, cmd_profile_show};
pub(crate) use program::{
    cmd_program_activate, cmd_program_generate, cmd_program_list, cmd_program_show,
};
pub(crate) use progress::{cmd_progress, cmd_stats};
pub(crate) use template::{
    cmd_template_create, cmd_template_delete, cmd_template_list, cmd_template_show,
};
pub(crate) use workout::{
    cmd_workout_delete, cmd_workout_list, cmd_workout_record, cmd_workout_show,
};
