mod entity_delete;
mod helper;
