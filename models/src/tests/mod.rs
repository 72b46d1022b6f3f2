mod overall_result;
mod status;
mod table_result;
